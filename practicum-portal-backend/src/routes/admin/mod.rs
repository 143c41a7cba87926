pub mod dashboard;
pub mod quotas;
pub mod schools;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use practicum_portal_database::ADMIN_ROLE;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::auth::{current_user, AuthenticatedUser};
use crate::csrf::CsrfToken;
use crate::error::AppError;
use crate::routes::{non_empty, query, render};
use crate::session::Session;
use crate::templating::{Notice, TemplateWrapper};
use crate::{see_other, AppState, ResponseBody};

pub const LOGIN_PATH: &str = "/admin/login";

/// Value of the `notice` query parameter after an admin logged out.
pub const LOGGED_OUT_NOTICE: &str = "logged-out";

/// Whether the logged-in user holds the admin role. Lookup failures count as denial.
async fn is_admin(state: &AppState, user: &AuthenticatedUser) -> bool {
    match state.store.has_role(&user.id, ADMIN_ROLE).await {
        Ok(is_admin) => is_admin,
        Err(err) => {
            error!(user_id = %user.id, "role lookup failed: {err}");
            false
        }
    }
}

/// Returns the admin or `None` when the request has to go to the login page.
pub async fn require_admin(state: &AppState, session: &Session) -> Option<AuthenticatedUser> {
    let user = current_user(state, session).await?;
    if is_admin(state, &user).await {
        Some(user)
    } else {
        warn!(user_id = %user.id, "admin access denied");
        None
    }
}

/// Early return for the admin handlers.
macro_rules! admin_or_login {
    ($state:expr, $session:expr) => {
        match $crate::routes::admin::require_admin($state, &$session).await {
            Some(admin) => admin,
            None => {
                return $crate::see_other($session, $crate::routes::admin::LOGIN_PATH);
            }
        }
    };
}
pub(crate) use admin_or_login;

#[derive(Deserialize)]
pub struct IdQuery {
    id: Option<String>,
}

impl IdQuery {
    pub fn id(&self) -> Option<i32> {
        non_empty(self.id.as_deref()).and_then(|id| id.parse().ok())
    }
}

#[derive(Deserialize)]
pub struct DeletePayload {
    csrf_token: String,
    pub id: i32,
}

impl CsrfToken for DeletePayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

/// Shared by the school and quota delete confirmations.
#[derive(Serialize)]
pub struct ConfirmPage<'a> {
    pub heading: &'a str,
    pub message: &'a str,
    pub warning: Option<&'a str>,
    pub action: &'a str,
    pub id: i32,
    pub cancel: &'a str,
}

#[derive(Deserialize)]
struct LoginQuery {
    notice: Option<String>,
}

#[derive(Serialize)]
struct LoginPage {
    return_to: &'static str,
}

pub async fn login(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let params: LoginQuery = query(&request)?;
    let user = current_user(state, &session).await;
    let admin = match &user {
        Some(user) => is_admin(state, user).await,
        None => false,
    };
    if admin {
        return see_other(session, "/admin");
    }
    let notice = match (&user, params.notice.as_deref()) {
        (Some(_), _) => Some(
            Notice::error("Access Denied")
                .with_description("Your account does not have administrator access."),
        ),
        (None, Some(LOGGED_OUT_NOTICE)) => Some(Notice::success("Logged out successfully")),
        (None, _) => None,
    };
    let csrf_token = session.csrf_token();
    let page = TemplateWrapper::new(
        &csrf_token,
        "Admin Login",
        LoginPage { return_to: "/admin" },
    )
    .email(user.as_ref().and_then(|user| user.email.as_deref()))
    .notice(notice.as_ref());
    render(state, session, StatusCode::OK, "admin-login", &page)
}
