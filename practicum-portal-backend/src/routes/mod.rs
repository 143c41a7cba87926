pub mod admin;
pub mod index;
pub mod openid_login;
pub mod openid_redirect;
pub mod profile;
pub mod register;
pub mod schools;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_database::models::Subject;
use practicum_portal_rules::eligibility::Eligibility;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
use crate::session::Session;
use crate::templating::TemplateWrapper;
use crate::{html, AppState, ResponseBody};

pub fn query<T: DeserializeOwned>(request: &Request<Bytes>) -> Result<T, AppError> {
    Ok(serde_urlencoded::from_str(
        request.uri().query().unwrap_or_default(),
    )?)
}

/// Treats empty query values like missing ones.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Re-reads the student stored by the eligibility check.
pub async fn verified_student(
    state: &AppState,
    session: &Session,
) -> Result<Option<Eligibility>, AppError> {
    let Some(student_id) = session.verified_student() else {
        return Ok(None);
    };
    Ok(state
        .store
        .student_by_student_id(student_id)
        .await?
        .map(|student| Eligibility::assess(&student)))
}

pub fn render<T: Serialize>(
    state: &AppState,
    session: Session,
    status: StatusCode,
    template: &str,
    page: &TemplateWrapper<'_, T>,
) -> Result<Response<ResponseBody>, AppError> {
    let body = state.templates.render(template, page)?;
    html(session, status, body)
}

#[derive(Serialize)]
pub struct SubjectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub fn subject_options(selected: Option<Subject>) -> Vec<SubjectOption> {
    Subject::ALL
        .into_iter()
        .map(|subject| SubjectOption {
            value: subject.as_str(),
            label: subject.label(),
            selected: selected == Some(subject),
        })
        .collect()
}
