use bytes::Bytes;
use http::{Request, Response};
use serde::Deserialize;

use crate::csrf::{csrf_safe_form, CsrfToken, TokenOnly};
use crate::error::AppError;
use crate::routes::admin::{LOGGED_OUT_NOTICE, LOGIN_PATH};
use crate::session::{PendingLogin, Session};
use crate::{see_other, AppState, ResponseBody};

#[derive(Deserialize)]
pub struct OpenIdLoginPayload {
    csrf_token: String,
    return_to: Option<String>,
}

impl CsrfToken for OpenIdLoginPayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

/// Only local paths, so the login can't be used as an open redirect.
pub fn safe_return_to(return_to: Option<&str>) -> String {
    match return_to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_owned()
        }
        _ => "/".to_owned(),
    }
}

pub async fn openid_login(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let form: OpenIdLoginPayload = csrf_safe_form(request.body(), &session)?;

    let (auth_url, login_state) = state.authenticator.begin().await?;

    let session = session.with_temporary_openidconnect_state(PendingLogin {
        state: login_state,
        return_to: safe_return_to(form.return_to.as_deref()),
    });
    see_other(session, &auth_url)
}

pub async fn openid_logout(
    _state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let _: TokenOnly = csrf_safe_form(request.body(), &session)?;
    see_other(
        session.without_openidconnect_session(),
        &format!("{LOGIN_PATH}?notice={LOGGED_OUT_NOTICE}"),
    )
}

#[cfg(test)]
mod tests {
    use super::safe_return_to;

    #[test]
    fn only_local_paths_are_kept() {
        assert_eq!(safe_return_to(Some("/schools?school=1")), "/schools?school=1");
        assert_eq!(safe_return_to(Some("//evil.example")), "/");
        assert_eq!(safe_return_to(Some("https://evil.example")), "/");
        assert_eq!(safe_return_to(Some("/\\evil.example")), "/");
        assert_eq!(safe_return_to(None), "/");
    }
}
