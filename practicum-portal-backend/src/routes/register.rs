use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_database::models::Subject;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::auth::current_user;
use crate::csrf::{csrf_safe_form, CsrfToken};
use crate::error::AppError;
use crate::registration::{self, RegistrationError};
use crate::routes::schools::{render_schools, BrowseQuery};
use crate::routes::{render, verified_student};
use crate::session::Session;
use crate::templating::{Notice, TemplateWrapper};
use crate::{see_other, AppState, ResponseBody};

/// Seconds the success page stays before returning to the start page.
pub const RETURN_DELAY_SECONDS: u32 = 3;

#[derive(Deserialize)]
pub struct RegisterPayload {
    csrf_token: String,
    school_id: i32,
    subject: Subject,
    #[serde(default)]
    quota_id: Option<i32>,
}

impl CsrfToken for RegisterPayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

#[derive(Serialize)]
struct RegisteredPage {
    refresh: u32,
    refresh_url: &'static str,
}

pub async fn register(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let form: RegisterPayload = csrf_safe_form(request.body(), &session)?;
    let Some(eligibility) = verified_student(state, &session).await? else {
        return see_other(session, "/");
    };
    let user = current_user(state, &session).await;

    match registration::register(
        state.store.as_ref(),
        user.as_ref(),
        &eligibility,
        form.school_id,
        form.subject,
        form.quota_id,
    )
    .await
    {
        Ok(_) => {
            let session = session.without_verified_student();
            let notice = Notice::success("Registration Successful!")
                .with_description("You have been registered for Field Experience Practice.");
            let csrf_token = session.csrf_token();
            let page = TemplateWrapper::new(
                &csrf_token,
                "Registration Successful",
                RegisteredPage {
                    refresh: RETURN_DELAY_SECONDS,
                    refresh_url: "/",
                },
            )
            .notice(Some(&notice));
            render(state, session, StatusCode::OK, "registered", &page)
        }
        Err(err) => {
            if matches!(err, RegistrationError::Failed(_)) {
                error!("registration failed: {err}");
            } else {
                warn!("registration refused: {err}");
            }
            let params = BrowseQuery {
                school: Some(form.school_id.to_string()),
                select: Some(form.subject.as_str().to_owned()),
                ..BrowseQuery::default()
            };
            let notice = Notice::error(err.to_string());
            render_schools(
                state,
                session,
                &eligibility,
                &params,
                err.status(),
                Some(&notice),
            )
            .await
        }
    }
}
