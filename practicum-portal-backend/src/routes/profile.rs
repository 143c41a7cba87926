use bytes::Bytes;
use http::{Request, Response};
use tracing::debug;

use crate::csrf::{csrf_safe_form, TokenOnly};
use crate::error::AppError;
use crate::session::Session;
use crate::{see_other, AppState, ResponseBody};

/// Forgets the verified student and the login.
pub async fn logout(
    _state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let _: TokenOnly = csrf_safe_form(request.body(), &session)?;
    debug!("student logged out");
    see_other(
        session
            .without_verified_student()
            .without_openidconnect_session(),
        "/",
    )
}
