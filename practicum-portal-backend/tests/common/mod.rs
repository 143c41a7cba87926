#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt as _, Full};
use practicum_portal_backend::auth::{AuthenticatedUser, Authenticator};
use practicum_portal_backend::error::AppError;
use practicum_portal_backend::{handle, AppState};
use practicum_portal_config::{Config, OpenIdConnectConfig};
use practicum_portal_database::memory::MemoryStore;
use practicum_portal_database::models::{NewSchool, NewSchoolQuota, NewStudent, School, Subject};
use practicum_portal_database::PortalStore;
use practicum_portal_openidconnect::{OpenIdRedirect, OpenIdRedirectSuccess};

pub const CSRF: &str = "test-csrf-token";
pub const PENDING_STATE: &str = "pending-login-state";
pub const PROVIDER_URL: &str = "https://login.example/authorize?state=abc";

/// Session tokens are `token:<user id>`. Anything else is treated as expired.
pub struct FakeAuthenticator;

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn begin(&self) -> Result<(String, String), AppError> {
        Ok((PROVIDER_URL.to_owned(), PENDING_STATE.to_owned()))
    }

    async fn finish(
        &self,
        state: &str,
        redirect: OpenIdRedirect<OpenIdRedirectSuccess>,
    ) -> Result<String, AppError> {
        if state != PENDING_STATE {
            return Err(AppError::WrongCsrfToken);
        }
        Ok(format!("token:{}", redirect.inner.code))
    }

    async fn current_user(&self, token: &str) -> Option<AuthenticatedUser> {
        token.strip_prefix("token:").map(|id| AuthenticatedUser {
            id: id.to_owned(),
            email: Some(format!("{id}@example.org")),
        })
    }
}

pub fn config() -> Config {
    Config {
        url: "http://localhost:3000".to_owned(),
        listen_address: "127.0.0.1:0".to_owned(),
        database_url: "postgres://unused".to_owned(),
        map_embed_url: "https://maps.example/embed".to_owned(),
        openidconnect: OpenIdConnectConfig {
            issuer_url: "https://login.example".to_owned(),
            client_id: "portal".to_owned(),
            client_secret: "secret".to_owned(),
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// The raw `Set-Cookie` line for `name`.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(&format!("{name}=")))
            .map(ToOwned::to_owned)
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            config(),
            Arc::clone(&store) as Arc<dyn PortalStore>,
            Arc::new(FakeAuthenticator),
        )
        .unwrap();
        Self {
            state: Arc::new(state),
            store,
        }
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> TestResponse {
        let response = handle(Arc::clone(&self.state), request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    pub async fn get(&self, uri: &str, cookies: &[(&str, &str)]) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(COOKIE, cookie_header(cookies))
            .body(Full::new(Bytes::new()))
            .unwrap();
        self.send(request).await
    }

    /// Posts an urlencoded form. The csrf token is added to both the form and the cookies.
    pub async fn post(
        &self,
        uri: &str,
        cookies: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> TestResponse {
        let mut fields = vec![("csrf_token", CSRF)];
        fields.extend_from_slice(form);
        self.post_raw(uri, cookies, &serde_urlencoded::to_string(fields).unwrap())
            .await
    }

    pub async fn post_raw(&self, uri: &str, cookies: &[(&str, &str)], body: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(COOKIE, cookie_header(cookies))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(body.to_owned())))
            .unwrap();
        self.send(request).await
    }

    pub async fn school(&self, name: &str, location: &str, min_gpa: f64) -> School {
        self.store
            .create_school(&NewSchool {
                name: name.to_owned(),
                location: location.to_owned(),
                address: Some(format!("Jl. {name}")),
                latitude: Some(-6.9),
                longitude: Some(107.6),
                min_gpa,
            })
            .await
            .unwrap()
    }

    pub async fn quota(&self, school_id: i32, subject: Subject, total_quota: i32) -> i32 {
        self.store
            .create_quota(&NewSchoolQuota {
                school_id,
                subject,
                total_quota,
            })
            .await
            .unwrap()
            .id
    }

    /// Fills `count` slots with other students.
    pub async fn fill(&self, school_id: i32, subject: Subject, count: usize) {
        for index in 0..count {
            let student_id = format!("filler-{school_id}-{subject}-{index}");
            let (quota, _) = self
                .store
                .quota_for(school_id, subject)
                .await
                .unwrap()
                .unwrap();
            self.store
                .register(
                    &format!("user-{student_id}"),
                    &NewStudent {
                        student_id: student_id.clone(),
                        user_id: None,
                        name: "Filler Student".to_owned(),
                        has_microteaching: true,
                    },
                    quota.id,
                )
                .await
                .unwrap();
        }
    }
}

fn cookie_header(cookies: &[(&str, &str)]) -> String {
    std::iter::once(("__Host_csrf_token", CSRF))
        .chain(cookies.iter().copied())
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn verified(student_id: &str) -> (&'static str, &str) {
    ("__Host_verified_student", student_id)
}

pub fn logged_in(token: &str) -> (&'static str, &str) {
    ("__Host_openidconnect_session", token)
}
