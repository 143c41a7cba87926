use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_database::models::{School, SchoolQuota, Subject};
use practicum_portal_rules::quota::available;
use practicum_portal_rules::stats::RegistrationStatistics;
use serde::{Deserialize, Serialize};

use super::admin_or_login;
use super::quotas::QuotaPayload;
use super::schools::{SchoolFormErrors, SchoolPayload};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::routes::{non_empty, query, render, subject_options, SubjectOption};
use crate::session::Session;
use crate::templating::{Notice, TemplateWrapper};
use crate::{AppState, ResponseBody};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Schools,
    Quotas,
    Stats,
}

impl Tab {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("quotas") => Self::Quotas,
            Some("stats") => Self::Stats,
            _ => Self::Schools,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct DashboardQuery {
    tab: Option<String>,
    edit: Option<String>,
    notice: Option<String>,
}

/// Maps the notice code of a post/redirect/get round trip to its message.
pub fn notice_for(code: &str) -> Option<Notice> {
    Some(match code {
        "school-added" => Notice::success("School added successfully"),
        "school-deleted" => Notice::success("School deleted successfully"),
        "school-delete-failed" => Notice::error("Failed to delete school"),
        "quota-added" => Notice::success("Quota added successfully"),
        "quota-updated" => Notice::success("Quota updated successfully"),
        "quota-update-failed" => Notice::error("Failed to update quota"),
        "quota-deleted" => Notice::success("Quota deleted successfully"),
        "quota-delete-failed" => Notice::error("Failed to delete quota"),
        _ => return None,
    })
}

/// What the dashboard shows besides the fetched tables.
#[derive(Default)]
pub struct DashboardView {
    pub tab: Tab,
    pub edit: Option<i32>,
    pub notice: Option<Notice>,
    pub school_form: SchoolPayload,
    pub school_errors: SchoolFormErrors,
    pub quota_form: QuotaPayload,
}

#[derive(Serialize)]
struct SchoolRow<'a> {
    id: i32,
    name: &'a str,
    location: &'a str,
    address: Option<&'a str>,
    min_gpa: String,
    coordinates: Option<String>,
}

impl<'a> From<&'a School> for SchoolRow<'a> {
    fn from(school: &'a School) -> Self {
        Self {
            id: school.id,
            name: &school.name,
            location: &school.location,
            address: school.address.as_deref(),
            min_gpa: format!("{:.2}", school.min_gpa),
            coordinates: school
                .latitude
                .zip(school.longitude)
                .map(|(latitude, longitude)| format!("{latitude:.5}, {longitude:.5}")),
        }
    }
}

#[derive(Serialize)]
struct QuotaRow<'a> {
    id: i32,
    school_name: &'a str,
    subject: &'static str,
    total_quota: i32,
    registered_count: i32,
    available: i32,
}

impl<'a> From<&'a (SchoolQuota, School)> for QuotaRow<'a> {
    fn from((quota, school): &'a (SchoolQuota, School)) -> Self {
        Self {
            id: quota.id,
            school_name: &school.name,
            subject: quota.subject.label(),
            total_quota: quota.total_quota,
            registered_count: quota.registered_count,
            available: available(quota.total_quota, quota.registered_count).max(0),
        }
    }
}

#[derive(Serialize)]
struct SchoolOption<'a> {
    id: i32,
    name: &'a str,
    selected: bool,
}

#[derive(Serialize)]
struct DashboardPage<'a> {
    tab_schools: bool,
    tab_quotas: bool,
    tab_stats: bool,
    schools: Vec<SchoolRow<'a>>,
    quotas: Vec<QuotaRow<'a>>,
    editing: Option<QuotaRow<'a>>,
    school_options: Vec<SchoolOption<'a>>,
    subjects: Vec<SubjectOption>,
    school_form: &'a SchoolPayload,
    school_errors: &'a SchoolFormErrors,
    quota_form: &'a QuotaPayload,
    stats: RegistrationStatistics,
}

pub async fn render_dashboard(
    state: &AppState,
    session: Session,
    admin: &AuthenticatedUser,
    view: DashboardView,
    status: StatusCode,
) -> Result<Response<ResponseBody>, AppError> {
    let (schools, quotas, registration_count, school_count) = tokio::try_join!(
        state.store.schools(),
        state.store.quotas(),
        state.store.registration_count(),
        state.store.school_count(),
    )?;

    let stats = RegistrationStatistics::aggregate(
        registration_count,
        school_count,
        quotas.iter().map(|(quota, _)| quota),
    );
    let selected_school: Option<i32> = view.quota_form.school_id.trim().parse().ok();
    let selected_subject: Option<Subject> = view.quota_form.subject.parse().ok();
    let editing = view
        .edit
        .and_then(|id| quotas.iter().find(|(quota, _)| quota.id == id))
        .map(QuotaRow::from);

    let csrf_token = session.csrf_token();
    let page = TemplateWrapper::new(
        &csrf_token,
        "Admin Dashboard",
        DashboardPage {
            tab_schools: view.tab == Tab::Schools,
            tab_quotas: view.tab == Tab::Quotas,
            tab_stats: view.tab == Tab::Stats,
            schools: schools.iter().map(SchoolRow::from).collect(),
            quotas: quotas.iter().map(QuotaRow::from).collect(),
            editing,
            school_options: schools
                .iter()
                .map(|school| SchoolOption {
                    id: school.id,
                    name: &school.name,
                    selected: selected_school == Some(school.id),
                })
                .collect(),
            subjects: subject_options(selected_subject),
            school_form: &view.school_form,
            school_errors: &view.school_errors,
            quota_form: &view.quota_form,
            stats,
        },
    )
    .email(admin.email.as_deref())
    .notice(view.notice.as_ref());
    render(state, session, status, "admin", &page)
}

pub async fn dashboard(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let admin = admin_or_login!(state, session);
    let params: DashboardQuery = query(&request)?;
    let edit = non_empty(params.edit.as_deref()).and_then(|id| id.parse().ok());
    let view = DashboardView {
        // editing always happens on the quota tab
        tab: if edit.is_some() {
            Tab::Quotas
        } else {
            Tab::parse(params.tab.as_deref())
        },
        edit,
        notice: non_empty(params.notice.as_deref()).and_then(notice_for),
        ..DashboardView::default()
    };
    render_dashboard(state, session, &admin, view, StatusCode::OK).await
}
