use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_rules::eligibility::Eligibility;
use practicum_portal_rules::profile::StudentProfile;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::csrf::{csrf_safe_form, CsrfToken};
use crate::error::AppError;
use crate::routes::{render, verified_student};
use crate::session::Session;
use crate::templating::{Notice, TemplateWrapper};
use crate::{see_other, AppState, ResponseBody};

#[derive(Deserialize)]
pub struct VerifyPayload {
    csrf_token: String,
    #[serde(default)]
    student_id: String,
}

impl CsrfToken for VerifyPayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

#[derive(Serialize)]
struct IndexPage<'a> {
    student_id: &'a str,
    result: Option<&'a Eligibility>,
}

fn index_page(
    state: &AppState,
    session: Session,
    status: StatusCode,
    student_id: &str,
    result: Option<&Eligibility>,
    notice: Option<&Notice>,
) -> Result<Response<ResponseBody>, AppError> {
    let csrf_token = session.csrf_token();
    let page = TemplateWrapper::new(
        &csrf_token,
        "Eligibility Check",
        IndexPage { student_id, result },
    )
    .notice(notice);
    render(state, session, status, "index", &page)
}

pub async fn index(
    state: &AppState,
    _request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let verified = verified_student(state, &session)
        .await?
        .filter(|eligibility| eligibility.eligible);
    let profile = verified.as_ref().map(StudentProfile::from);
    let csrf_token = session.csrf_token();
    let page = TemplateWrapper::new(
        &csrf_token,
        "Eligibility Check",
        IndexPage {
            student_id: verified
                .as_ref()
                .map_or("", |eligibility| eligibility.student_id.as_str()),
            result: verified.as_ref(),
        },
    )
    .profile(profile.as_ref());
    render(state, session, StatusCode::OK, "index", &page)
}

/// Looks the student up and, if eligible, remembers them and continues to the school list.
pub async fn verify(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let form: VerifyPayload = csrf_safe_form(request.body(), &session)?;
    let student_id = form.student_id.trim();

    if student_id.is_empty() {
        let notice = Notice::error("Please enter your Student ID");
        return index_page(
            state,
            session,
            StatusCode::UNPROCESSABLE_ENTITY,
            student_id,
            None,
            Some(&notice),
        );
    }

    let student = match state.store.student_by_student_id(student_id).await {
        Ok(student) => student,
        Err(err) => {
            error!("eligibility lookup failed: {err}");
            let notice = Notice::error("Verification failed").with_description(err.to_string());
            return index_page(
                state,
                session,
                StatusCode::INTERNAL_SERVER_ERROR,
                student_id,
                None,
                Some(&notice),
            );
        }
    };

    let Some(student) = student else {
        let notice = Notice::error("Student ID not found")
            .with_description("Please check your student ID and try again.");
        return index_page(
            state,
            session,
            StatusCode::NOT_FOUND,
            student_id,
            None,
            Some(&notice),
        );
    };

    let eligibility = Eligibility::assess(&student);
    if eligibility.eligible {
        info!(student_id, "student verified");
        return see_other(
            session.with_verified_student(student.student_id),
            "/schools",
        );
    }

    let notice = Notice::error("Not eligible").with_description(if eligibility.has_microteaching {
        "You need a minimum grade of B in Microteaching to register for Field Experience."
    } else {
        "You need to complete Microteaching before registering for Field Experience."
    });
    index_page(
        state,
        session.without_verified_student(),
        StatusCode::OK,
        student_id,
        Some(&eligibility),
        Some(&notice),
    )
}
