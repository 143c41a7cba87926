use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_database::models::{NewSchoolQuota, Subject};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::dashboard::{render_dashboard, DashboardView, Tab};
use super::{admin_or_login, ConfirmPage, DeletePayload, IdQuery};
use crate::csrf::{csrf_safe_form, CsrfToken};
use crate::error::AppError;
use crate::routes::{query, render};
use crate::session::Session;
use crate::templating::{Notice, TemplateWrapper};
use crate::{see_other, AppState, ResponseBody};

const FILL_IN_ALL_FIELDS: &str = "Please fill in all fields";
const NON_NEGATIVE_QUOTA: &str = "The quota must be a whole number of zero or more";

#[derive(Debug, PartialEq, Eq)]
pub enum QuotaFormError {
    Missing,
    InvalidTotal,
}

impl QuotaFormError {
    const fn message(&self) -> &'static str {
        match self {
            Self::Missing => FILL_IN_ALL_FIELDS,
            Self::InvalidTotal => NON_NEGATIVE_QUOTA,
        }
    }
}

fn parse_total(value: &str) -> Result<i32, QuotaFormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(QuotaFormError::Missing);
    }
    value
        .parse::<u32>()
        .ok()
        .and_then(|total| i32::try_from(total).ok())
        .ok_or(QuotaFormError::InvalidTotal)
}

/// The add quota form as typed.
#[derive(Deserialize, Serialize, Default)]
pub struct QuotaPayload {
    #[serde(skip_serializing)]
    csrf_token: String,
    #[serde(default)]
    pub school_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub total_quota: String,
}

impl CsrfToken for QuotaPayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

impl QuotaPayload {
    pub fn validate(&self) -> Result<NewSchoolQuota, QuotaFormError> {
        let school_id = self.school_id.trim().parse::<i32>().ok();
        let subject = self.subject.parse::<Subject>().ok();
        let total_quota = parse_total(&self.total_quota)?;
        match (school_id, subject) {
            (Some(school_id), Some(subject)) => Ok(NewSchoolQuota {
                school_id,
                subject,
                total_quota,
            }),
            _ => Err(QuotaFormError::Missing),
        }
    }
}

pub async fn create(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let admin = admin_or_login!(state, session);
    let form: QuotaPayload = csrf_safe_form(request.body(), &session)?;

    let (notice, status) = match form.validate() {
        Ok(quota) => match state.store.create_quota(&quota).await {
            Ok(quota) => {
                info!(quota_id = quota.id, school_id = quota.school_id, "quota added");
                return see_other(session, "/admin?tab=quotas&notice=quota-added");
            }
            Err(err) => {
                error!("failed to add quota: {err}");
                (
                    Notice::error("Failed to add quota").with_description(err.to_string()),
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        },
        Err(err) => (
            Notice::error(err.message()),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    };
    let view = DashboardView {
        tab: Tab::Quotas,
        notice: Some(notice),
        quota_form: form,
        ..DashboardView::default()
    };
    render_dashboard(state, session, &admin, view, status).await
}

#[derive(Deserialize)]
pub struct UpdatePayload {
    csrf_token: String,
    id: i32,
    #[serde(default)]
    total_quota: String,
}

impl CsrfToken for UpdatePayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

/// Changes the capacity only. School and subject stay as they are.
pub async fn update(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let admin = admin_or_login!(state, session);
    let form: UpdatePayload = csrf_safe_form(request.body(), &session)?;

    let total_quota = match parse_total(&form.total_quota) {
        Ok(total_quota) => total_quota,
        Err(err) => {
            let view = DashboardView {
                tab: Tab::Quotas,
                edit: Some(form.id),
                notice: Some(Notice::error(err.message())),
                ..DashboardView::default()
            };
            return render_dashboard(state, session, &admin, view, StatusCode::UNPROCESSABLE_ENTITY)
                .await;
        }
    };

    let code = match state.store.update_quota_total(form.id, total_quota).await {
        Ok(true) => {
            info!(quota_id = form.id, total_quota, "quota updated");
            "quota-updated"
        }
        Ok(false) => "quota-update-failed",
        Err(err) => {
            error!(quota_id = form.id, "failed to update quota: {err}");
            "quota-update-failed"
        }
    };
    see_other(session, &format!("/admin?tab=quotas&notice={code}"))
}

pub async fn confirm_delete(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let admin = admin_or_login!(state, session);
    let params: IdQuery = query(&request)?;
    let quota = match params.id() {
        Some(id) => state.store.quota(id).await?,
        None => None,
    };
    let Some((quota, school)) = quota else {
        return see_other(session, "/admin?tab=quotas");
    };

    let message = format!(
        "Delete the {} quota of {} ({} registered)?",
        quota.subject.label(),
        school.name,
        quota.registered_count
    );
    let csrf_token = session.csrf_token();
    let page = TemplateWrapper::new(
        &csrf_token,
        "Delete Quota",
        ConfirmPage {
            heading: "Delete Quota",
            message: &message,
            warning: None,
            action: "/admin/quotas/delete",
            id: quota.id,
            cancel: "/admin?tab=quotas",
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
    let code = match state.store.delete_quota(form.id).await {
        Ok(true) => {
            info!(quota_id = form.id, "quota deleted");
            "quota-deleted"
        }
        Ok(false) => "quota-delete-failed",
        Err(err) => {
            error!(quota_id = form.id, "failed to delete quota: {err}");
            "quota-delete-failed"
        }
    };
    see_other(session, &format!("/admin?tab=quotas&notice={code}"))
}
