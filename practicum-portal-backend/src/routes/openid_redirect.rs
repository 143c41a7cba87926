use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_openidconnect::{OpenIdRedirect, OpenIdRedirectInner};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::routes::{query, render};
use crate::session::Session;
use crate::templating::TemplateWrapper;
use crate::{see_other, AppState, ResponseBody};

#[derive(Serialize)]
struct OpenIdErrorPage {
    error: String,
    error_description: String,
}

pub async fn openid_redirect(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let redirect: OpenIdRedirect<OpenIdRedirectInner> = query(&request)?;

    let (pending, session) = session.get_and_remove_temporary_openidconnect_state()?;

    match redirect.inner {
        OpenIdRedirectInner::Error(err) => {
            warn!(error = %err.error, "login provider returned an error");
            let csrf_token = session.csrf_token();
            let page = TemplateWrapper::new(
                &csrf_token,
                "Login Failed",
                OpenIdErrorPage {
                    error: err.error,
                    error_description: err.error_description,
                },
            );
            render(state, session, StatusCode::OK, "openid-error", &page)
        }
        OpenIdRedirectInner::Success(success) => {
            let id_token = state
                .authenticator
                .finish(
                    &pending.state,
                    OpenIdRedirect {
                        state: redirect.state,
                        inner: success,
                    },
                )
                .await?;
            info!("user logged in");
            see_other(
                session.with_openidconnect_session(id_token),
                &pending.return_to,
            )
        }
    }
}
