use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_database::models::NewSchool;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{admin_or_login, ConfirmPage, DeletePayload, IdQuery};
use super::dashboard::{render_dashboard, DashboardView, Tab};
use crate::csrf::{csrf_safe_form, CsrfToken};
use crate::error::AppError;
use crate::routes::{non_empty, query, render};
use crate::session::Session;
use crate::templating::{Notice, TemplateWrapper};
use crate::{see_other, AppState, ResponseBody};

/// The add school form as typed, so it can be shown again next to its errors.
#[derive(Deserialize, Serialize, Default)]
pub struct SchoolPayload {
    #[serde(skip_serializing)]
    csrf_token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub min_gpa: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
}

impl CsrfToken for SchoolPayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

#[derive(Serialize, Default, Debug, PartialEq, Eq)]
pub struct SchoolFormErrors {
    pub name: Option<&'static str>,
    pub location: Option<&'static str>,
    pub min_gpa: Option<&'static str>,
    pub latitude: Option<&'static str>,
    pub longitude: Option<&'static str>,
}

/// Parses an optional number and checks it against `range`. Blank means `None`.
fn bounded(
    value: &str,
    range: core::ops::RangeInclusive<f64>,
    message: &'static str,
) -> Result<Option<f64>, &'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(number) if range.contains(&number) => Ok(Some(number)),
        _ => Err(message),
    }
}

impl SchoolPayload {
    pub fn validate(&self) -> Result<NewSchool, SchoolFormErrors> {
        let mut errors = SchoolFormErrors::default();
        let name = self.name.trim();
        if name.is_empty() {
            errors.name = Some("Name is required");
        }
        let location = self.location.trim();
        if location.is_empty() {
            errors.location = Some("Location is required");
        }
        let min_gpa = bounded(&self.min_gpa, 0.0..=4.0, "Min GPA must be between 0 and 4")
            .unwrap_or_else(|message| {
                errors.min_gpa = Some(message);
                None
            });
        let latitude = bounded(
            &self.latitude,
            -90.0..=90.0,
            "Latitude must be between -90 and 90",
        )
        .unwrap_or_else(|message| {
            errors.latitude = Some(message);
            None
        });
        let longitude = bounded(
            &self.longitude,
            -180.0..=180.0,
            "Longitude must be between -180 and 180",
        )
        .unwrap_or_else(|message| {
            errors.longitude = Some(message);
            None
        });

        if errors != SchoolFormErrors::default() {
            return Err(errors);
        }
        Ok(NewSchool {
            name: name.to_owned(),
            location: location.to_owned(),
            address: non_empty(Some(self.address.as_str())).map(ToOwned::to_owned),
            latitude,
            longitude,
            min_gpa: min_gpa.unwrap_or(0.0),
        })
    }
}

pub async fn create(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let admin = admin_or_login!(state, session);
    let form: SchoolPayload = csrf_safe_form(request.body(), &session)?;

    let (notice, school_errors, status) = match form.validate() {
        Ok(school) => match state.store.create_school(&school).await {
            Ok(school) => {
                info!(school_id = school.id, "school added");
                return see_other(session, "/admin?tab=schools&notice=school-added");
            }
            Err(err) => {
                error!("failed to add school: {err}");
                (
                    Notice::error("Failed to add school").with_description(err.to_string()),
                    SchoolFormErrors::default(),
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        },
        Err(errors) => (
            Notice::error("Please correct the highlighted fields"),
            errors,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    };
    let view = DashboardView {
        tab: Tab::Schools,
        notice: Some(notice),
        school_form: form,
        school_errors,
        ..DashboardView::default()
    };
    render_dashboard(state, session, &admin, view, status).await
}

pub async fn confirm_delete(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let admin = admin_or_login!(state, session);
    let params: IdQuery = query(&request)?;
    let schools = state.store.schools().await?;
    let Some(school) = params
        .id()
        .and_then(|id| schools.iter().find(|school| school.id == id))
    else {
        return see_other(session, "/admin?tab=schools");
    };

    let message = format!("Delete {} in {}?", school.name, school.location);
    let csrf_token = session.csrf_token();
    let page = TemplateWrapper::new(
        &csrf_token,
        "Delete School",
        ConfirmPage {
            heading: "Delete School",
            message: &message,
            warning: Some("All associated quotas will be removed."),
            action: "/admin/schools/delete",
            id: school.id,
            cancel: "/admin?tab=schools",
        },
    )
    .email(admin.email.as_deref());
    render(state, session, StatusCode::OK, "confirm", &page)
}

pub async fn delete(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let _admin = admin_or_login!(state, session);
    let form: DeletePayload = csrf_safe_form(request.body(), &session)?;
    let code = match state.store.delete_school(form.id).await {
        Ok(true) => {
            info!(school_id = form.id, "school deleted");
            "school-deleted"
        }
        Ok(false) => "school-delete-failed",
        Err(err) => {
            error!(school_id = form.id, "failed to delete school: {err}");
            "school-delete-failed"
        }
    };
    see_other(session, &format!("/admin?tab=schools&notice={code}"))
}
