mod common;

use common::{logged_in, TestApp};
use http::StatusCode;
use practicum_portal_database::models::Subject;
use practicum_portal_database::{PortalStore as _, ADMIN_ROLE};

fn admin_app() -> TestApp {
    let app = TestApp::new();
    app.store.grant_role("ana", ADMIN_ROLE);
    app
}

const ADMIN: (&str, &str) = ("__Host_openidconnect_session", "token:ana");

#[tokio::test]
async fn dashboard_requires_a_session() {
    let app = admin_app();

    let response = app.get("/admin", &[]).await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/admin/login"));
}

#[tokio::test]
async fn dashboard_requires_the_admin_role() {
    let app = admin_app();

    let response = app.get("/admin", &[logged_in("token:budi")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/admin/login"));

    let login = app.get("/admin/login", &[logged_in("token:budi")]).await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.body.contains("Access Denied"));
}

#[tokio::test]
async fn expired_login_counts_as_logged_out() {
    let app = admin_app();

    let response = app.get("/admin", &[logged_in("expired")]).await;

    assert_eq!(response.location(), Some("/admin/login"));
    let login = app.get("/admin/login", &[logged_in("expired")]).await;
    assert!(!login.body.contains("Access Denied"));
}

#[tokio::test]
async fn mutations_are_gated_too() {
    let app = admin_app();

    let response = app
        .post(
            "/admin/schools",
            &[logged_in("token:budi")],
            &[("name", "SMA"), ("location", "Bandung")],
        )
        .await;

    assert_eq!(response.location(), Some("/admin/login"));
    assert!(app.store.schools().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_sees_the_dashboard_with_email() {
    let app = admin_app();
    app.school("SMA Negeri 1", "Bandung", 0.0).await;

    let response = app.get("/admin", &[ADMIN]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Admin Dashboard"));
    assert!(response.body.contains("ana@example.org"));
    assert!(response.body.contains("SMA Negeri 1"));

    let login = app.get("/admin/login", &[ADMIN]).await;
    assert_eq!(login.location(), Some("/admin"));
}

#[tokio::test]
async fn statistics_sum_the_quotas() {
    let app = admin_app();
    let first = app.school("SMA Negeri 1", "Bandung", 0.0).await;
    let second = app.school("SMA Negeri 2", "Bandung", 0.0).await;
    app.quota(first.id, Subject::Math, 3).await;
    app.fill(first.id, Subject::Math, 1).await;
    app.quota(second.id, Subject::English, 2).await;
    app.fill(second.id, Subject::English, 2).await;

    let response = app.get("/admin?tab=stats", &[ADMIN]).await;

    let body = &response.body;
    assert!(body.contains("<dt>Total registrations</dt><dd>3</dd>"));
    assert!(body.contains("<dt>Total schools</dt><dd>2</dd>"));
    assert!(body.contains("<dt>Total quota</dt><dd>5</dd>"));
    assert!(body.contains("<dt>Registered</dt><dd>3</dd>"));
    assert!(body.contains("<dt>Available slots</dt><dd>2</dd>"));
}

#[tokio::test]
async fn adding_a_school_redirects_with_a_notice() {
    let app = admin_app();

    let response = app
        .post(
            "/admin/schools",
            &[ADMIN],
            &[
                ("name", " SMA Negeri 5 "),
                ("location", "Bandung"),
                ("address", ""),
                ("min_gpa", "3.25"),
                ("latitude", "-6.9"),
                ("longitude", "107.6"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location(),
        Some("/admin?tab=schools&notice=school-added")
    );
    let schools = app.store.schools().await.unwrap();
    assert_eq!(schools.len(), 1);
    assert_eq!(schools[0].name, "SMA Negeri 5");
    assert_eq!(schools[0].address, None);

    let page = app
        .get("/admin?tab=schools&notice=school-added", &[ADMIN])
        .await;
    assert!(page.body.contains("School added successfully"));
}

#[tokio::test]
async fn invalid_school_is_shown_again_with_field_errors() {
    let app = admin_app();

    let response = app
        .post(
            "/admin/schools",
            &[ADMIN],
            &[("name", ""), ("location", "Bandung"), ("latitude", "100")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Name is required"));
    assert!(response.body.contains("Latitude must be between -90 and 90"));
    assert!(response.body.contains(r#"value="Bandung""#));
    assert!(app.store.schools().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_school_removes_its_quotas() {
    let app = admin_app();
    let school = app.school("SMA Negeri 1", "Bandung", 0.0).await;
    app.quota(school.id, Subject::Physics, 4).await;
    let id = school.id.to_string();

    let confirm = app
        .get(&format!("/admin/schools/delete?id={id}"), &[ADMIN])
        .await;
    assert!(confirm
        .body
        .contains("All associated quotas will be removed."));

    let response = app
        .post("/admin/schools/delete", &[ADMIN], &[("id", &id)])
        .await;
    assert_eq!(
        response.location(),
        Some("/admin?tab=schools&notice=school-deleted")
    );
    assert!(app.store.schools().await.unwrap().is_empty());
    assert!(app.store.quotas().await.unwrap().is_empty());
}

#[tokio::test]
async fn quota_form_needs_every_field() {
    let app = admin_app();
    let school = app.school("SMA Negeri 1", "Bandung", 0.0).await;

    let response = app
        .post(
            "/admin/quotas",
            &[ADMIN],
            &[
                ("school_id", &school.id.to_string()),
                ("subject", ""),
                ("total_quota", "5"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Please fill in all fields"));
    assert!(app.store.quotas().await.unwrap().is_empty());
}

#[tokio::test]
async fn quotas_are_added_updated_and_deleted() {
    let app = admin_app();
    let school = app.school("SMA Negeri 1", "Bandung", 0.0).await;
    let school_id = school.id.to_string();

    let added = app
        .post(
            "/admin/quotas",
            &[ADMIN],
            &[
                ("school_id", &school_id),
                ("subject", "chemistry"),
                ("total_quota", "6"),
            ],
        )
        .await;
    assert_eq!(
        added.location(),
        Some("/admin?tab=quotas&notice=quota-added")
    );
    let quota_id = app.store.quotas().await.unwrap()[0].0.id.to_string();

    let edit = app
        .get(&format!("/admin?edit={quota_id}"), &[ADMIN])
        .await;
    assert!(edit.body.contains("Edit Quota"));

    let updated = app
        .post(
            "/admin/quotas/update",
            &[ADMIN],
            &[("id", &quota_id), ("total_quota", "9")],
        )
        .await;
    assert_eq!(
        updated.location(),
        Some("/admin?tab=quotas&notice=quota-updated")
    );
    assert_eq!(app.store.quotas().await.unwrap()[0].0.total_quota, 9);

    let deleted = app
        .post("/admin/quotas/delete", &[ADMIN], &[("id", &quota_id)])
        .await;
    assert_eq!(
        deleted.location(),
        Some("/admin?tab=quotas&notice=quota-deleted")
    );
    assert!(app.store.quotas().await.unwrap().is_empty());
}

#[tokio::test]
async fn updating_a_missing_quota_reports_failure() {
    let app = admin_app();

    let response = app
        .post(
            "/admin/quotas/update",
            &[ADMIN],
            &[("id", "404"), ("total_quota", "3")],
        )
        .await;

    assert_eq!(
        response.location(),
        Some("/admin?tab=quotas&notice=quota-update-failed")
    );
}
