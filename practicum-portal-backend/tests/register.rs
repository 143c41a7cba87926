mod common;

use common::{logged_in, verified, TestApp};
use http::StatusCode;
use practicum_portal_database::models::Subject;
use practicum_portal_database::PortalStore as _;

async fn app_with_quota(total_quota: i32) -> (TestApp, String) {
    let app = TestApp::new();
    app.store
        .insert_student("2021001", "Siti Rahma", true, Some("A-"), 3.4);
    let school = app.school("SMA Negeri 1", "Bandung", 3.0).await;
    app.quota(school.id, Subject::Chemistry, total_quota).await;
    (app, school.id.to_string())
}

#[tokio::test]
async fn registration_succeeds_and_returns_to_the_start() {
    let (app, school_id) = app_with_quota(5).await;

    let response = app
        .post(
            "/register",
            &[verified("2021001"), logged_in("token:siti")],
            &[("school_id", &school_id), ("subject", "chemistry")],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Registration Successful!"));
    assert!(response
        .body
        .contains("You have been registered for Field Experience Practice."));
    assert!(response.body.contains(r#"http-equiv="refresh" content="3;url=/""#));
    assert!(response
        .set_cookie("__Host_verified_student")
        .unwrap()
        .contains("Max-Age=0"));

    let registrations = app.store.registrations();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].subject, Subject::Chemistry);
    let quota = app.store.quotas().await.unwrap();
    assert_eq!(quota[0].0.registered_count, 1);
}

#[tokio::test]
async fn second_registration_is_refused_without_a_duplicate() {
    let (app, school_id) = app_with_quota(5).await;
    let cookies = [verified("2021001"), logged_in("token:siti")];
    let form = [("school_id", school_id.as_str()), ("subject", "chemistry")];

    app.post("/register", &cookies, &form).await;
    let response = app.post("/register", &cookies, &form).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response
        .body
        .contains("You have already registered for a school"));
    assert_eq!(app.store.registrations().len(), 1);
}

#[tokio::test]
async fn registration_requires_a_login() {
    let (app, school_id) = app_with_quota(5).await;

    let response = app
        .post(
            "/register",
            &[verified("2021001")],
            &[("school_id", &school_id), ("subject", "chemistry")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body.contains("Please log in before registering"));
    assert!(app.store.registrations().is_empty());
    assert!(app.store.students()[0].user_id.is_none());
}

#[tokio::test]
async fn full_quota_is_rechecked_on_submit() {
    let (app, school_id) = app_with_quota(1).await;
    app.fill(school_id.parse().unwrap(), Subject::Chemistry, 1)
        .await;

    let response = app
        .post(
            "/register",
            &[verified("2021001"), logged_in("token:siti")],
            &[("school_id", &school_id), ("subject", "chemistry")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.registrations().len(), 1);
}

#[tokio::test]
async fn record_linked_to_another_account_is_refused() {
    let (app, school_id) = app_with_quota(5).await;
    let form = [("school_id", school_id.as_str()), ("subject", "chemistry")];

    app.post(
        "/register",
        &[verified("2021001"), logged_in("token:siti")],
        &form,
    )
    .await;
    let response = app
        .post(
            "/register",
            &[verified("2021001"), logged_in("token:mallory")],
            &form,
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response
        .body
        .contains("This student ID is already linked to another account"));
}

#[tokio::test]
async fn duplicate_quota_rows_register_against_the_open_one() {
    let (app, school_id) = app_with_quota(0).await;
    let open = app
        .quota(school_id.parse().unwrap(), Subject::Chemistry, 5)
        .await;
    let cookies = [verified("2021001"), logged_in("token:siti")];

    let page = app
        .get(
            &format!("/schools?school={school_id}&select=chemistry"),
            &cookies,
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Complete Registration"));
    assert!(page
        .body
        .contains(&format!(r#"name="quota_id" value="{open}""#)));

    let open_id = open.to_string();
    let response = app
        .post(
            "/register",
            &cookies,
            &[
                ("school_id", &school_id),
                ("subject", "chemistry"),
                ("quota_id", &open_id),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.store.registrations()[0].quota_id, Some(open));
    let quotas = app.store.quotas().await.unwrap();
    let counted: i32 = quotas.iter().map(|(quota, _)| quota.registered_count).sum();
    assert_eq!(counted, 1);
}
