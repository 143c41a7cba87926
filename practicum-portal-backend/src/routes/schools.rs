use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_database::models::{School, Subject};
use practicum_portal_rules::browser::{group_by_school, select, SchoolListing, Selection};
use practicum_portal_rules::eligibility::Eligibility;
use practicum_portal_rules::profile::StudentProfile;
use practicum_portal_rules::quota::QuotaStatus;
use serde::{Deserialize, Serialize};

use crate::auth::current_user;
use crate::error::AppError;
use crate::routes::{non_empty, query, render, subject_options, verified_student, SubjectOption};
use crate::session::Session;
use crate::templating::{Notice, TemplateWrapper};
use crate::{see_other, AppState, ResponseBody};

/// Query of `/schools`. `school` and `select` name the requested selection.
#[derive(Deserialize, Default)]
pub struct BrowseQuery {
    pub subject: Option<String>,
    pub q: Option<String>,
    pub school: Option<String>,
    pub select: Option<String>,
}

impl BrowseQuery {
    fn subject_filter(&self) -> Option<Subject> {
        non_empty(self.subject.as_deref()).and_then(|subject| subject.parse().ok())
    }

    fn search(&self) -> &str {
        non_empty(self.q.as_deref()).unwrap_or_default()
    }

    fn requested(&self) -> Option<(i32, Subject)> {
        let school = non_empty(self.school.as_deref())?.parse().ok()?;
        let subject = non_empty(self.select.as_deref())?.parse().ok()?;
        Some((school, subject))
    }

    fn link(&self, school_id: i32, subject: Subject) -> Result<String, AppError> {
        let school_id = school_id.to_string();
        let mut pairs = vec![];
        if let Some(filter) = self.subject_filter() {
            pairs.push(("subject", filter.as_str()));
        }
        let search = self.search();
        if !search.is_empty() {
            pairs.push(("q", search));
        }
        pairs.push(("school", school_id.as_str()));
        pairs.push(("select", subject.as_str()));
        Ok(format!("/schools?{}", serde_urlencoded::to_string(pairs)?))
    }
}

#[derive(Serialize)]
struct EntryView {
    subject: &'static str,
    label: &'static str,
    total_quota: i32,
    registered_count: i32,
    available: i32,
    status: &'static str,
    status_class: &'static str,
    selectable: bool,
    selected: bool,
    href: Option<String>,
}

#[derive(Serialize)]
struct ListingView {
    id: i32,
    name: String,
    location: String,
    min_gpa_badge: Option<String>,
    meets_gpa: bool,
    gpa_warning: Option<String>,
    entries: Vec<EntryView>,
}

#[derive(Serialize)]
struct SelectionView<'a> {
    school_id: i32,
    quota_id: i32,
    school_name: &'a str,
    location: &'a str,
    address: Option<&'a str>,
    subject: &'static str,
    subject_label: &'static str,
    available: i32,
    map_url: Option<String>,
}

#[derive(Serialize)]
struct SchoolsPage<'a> {
    subjects: Vec<SubjectOption>,
    search: &'a str,
    listings: Vec<ListingView>,
    selection: Option<SelectionView<'a>>,
    logged_in: bool,
    return_to: String,
}

/// OpenStreetMap embed centered on the school with a marker.
pub fn map_embed_url(base: &str, latitude: f64, longitude: f64) -> String {
    const SPAN: f64 = 0.01;
    format!(
        "{base}?bbox={:.6}%2C{:.6}%2C{:.6}%2C{:.6}&layer=mapnik&marker={latitude:.6}%2C{longitude:.6}",
        longitude - SPAN,
        latitude - SPAN,
        longitude + SPAN,
        latitude + SPAN,
    )
}

fn listing_view(
    listing: &SchoolListing,
    params: &BrowseQuery,
    selection: Option<Selection>,
    gpa: f64,
) -> Result<ListingView, AppError> {
    let entries = listing
        .subjects
        .iter()
        .map(|entry| -> Result<EntryView, AppError> {
            let selectable = listing.is_selectable(entry, gpa);
            let status = entry.status.label();
            Ok(EntryView {
                subject: entry.subject.as_str(),
                label: entry.subject.label(),
                total_quota: entry.total_quota,
                registered_count: entry.registered_count,
                available: entry.available.max(0),
                status,
                status_class: match entry.status {
                    QuotaStatus::Full => "full",
                    QuotaStatus::Limited => "limited",
                    QuotaStatus::Available => "available",
                },
                selectable,
                selected: selection.map(|selection| selection.quota_id) == Some(entry.quota_id),
                href: if selectable {
                    Some(params.link(listing.school.id, entry.subject)?)
                } else {
                    None
                },
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    let min_gpa = listing.school.min_gpa;
    let meets_gpa = listing.meets_gpa(gpa);
    Ok(ListingView {
        id: listing.school.id,
        name: listing.school.name.clone(),
        location: listing.school.location.clone(),
        min_gpa_badge: (min_gpa > 0.0).then(|| format!("{min_gpa:.1}")),
        meets_gpa,
        gpa_warning: (!meets_gpa)
            .then(|| format!("Your GPA ({gpa:.2}) does not meet the minimum requirement")),
        entries,
    })
}

fn selection_view<'a>(
    state: &AppState,
    school: &'a School,
    listing: &SchoolListing,
    selection: Selection,
) -> SelectionView<'a> {
    SelectionView {
        school_id: school.id,
        quota_id: selection.quota_id,
        school_name: &school.name,
        location: &school.location,
        address: school.address.as_deref(),
        subject: selection.subject.as_str(),
        subject_label: selection.subject.label(),
        available: listing
            .entry(selection.quota_id)
            .map_or(0, |entry| entry.available.max(0)),
        map_url: school
            .latitude
            .zip(school.longitude)
            .map(|(latitude, longitude)| {
                map_embed_url(&state.config.map_embed_url, latitude, longitude)
            }),
    }
}

/// Renders the school list for a verified student. Also used to show registration failures.
pub async fn render_schools(
    state: &AppState,
    session: Session,
    eligibility: &Eligibility,
    params: &BrowseQuery,
    status: StatusCode,
    notice: Option<&Notice>,
) -> Result<Response<ResponseBody>, AppError> {
    let rows = state.store.open_quotas(params.subject_filter()).await?;
    let search = params.search();
    let listings: Vec<SchoolListing> = group_by_school(rows)
        .into_iter()
        .filter(|listing| listing.matches_search(search))
        .collect();

    let selection = params.requested().and_then(|(school_id, subject)| {
        select(None, &listings, school_id, subject, eligibility.gpa)
    });

    let listing_views = listings
        .iter()
        .map(|listing| listing_view(listing, params, selection, eligibility.gpa))
        .collect::<Result<Vec<_>, AppError>>()?;

    let selected_listing = selection.and_then(|selection| {
        listings
            .iter()
            .find(|listing| listing.school.id == selection.school_id)
            .map(|listing| (listing, selection))
    });
    let selected = selected_listing
        .map(|(listing, selection)| selection_view(state, &listing.school, listing, selection));

    let logged_in = current_user(state, &session).await.is_some();
    let return_to = match params.requested() {
        Some((school_id, subject)) => params.link(school_id, subject)?,
        None => "/schools".to_owned(),
    };

    let profile = StudentProfile::from(eligibility);
    let csrf_token = session.csrf_token();
    let page = TemplateWrapper::new(
        &csrf_token,
        "Choose a School",
        SchoolsPage {
            subjects: subject_options(params.subject_filter()),
            search,
            listings: listing_views,
            selection: selected,
            logged_in,
            return_to,
        },
    )
    .profile(Some(&profile))
    .notice(notice);
    render(state, session, status, "schools", &page)
}

pub async fn browse(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let params: BrowseQuery = query(&request)?;
    match verified_student(state, &session).await? {
        Some(eligibility) if eligibility.eligible => {
            render_schools(state, session, &eligibility, &params, StatusCode::OK, None).await
        }
        Some(_) => see_other(session.without_verified_student(), "/"),
        None => see_other(session, "/"),
    }
}
