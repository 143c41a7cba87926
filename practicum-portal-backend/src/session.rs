use cookie::{Cookie, SameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::HeaderMap;
use rand::{thread_rng, Rng as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

const COOKIE_NAME_CSRF_TOKEN: &str = "__Host_csrf_token";
const COOKIE_NAME_OPENIDCONNECT_SESSION: &str = "__Host_openidconnect_session";
const COOKIE_NAME_TEMPORARY_OPENIDCONNECT_STATE: &str = "__Host_temporary_openidconnect_state";
const COOKIE_NAME_VERIFIED_STUDENT: &str = "__Host_verified_student";

/// The login that is in flight between `/openidconnect-login` and the provider's redirect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub state: String,
    pub return_to: String,
}

/// Everything the portal keeps in cookies. The bool is true when the value changed and has to be
/// sent back.
#[derive(Clone, Debug)]
#[must_use]
pub struct Session {
    csrf_token: (String, bool),
    openidconnect_session: (Option<String>, bool),
    temporary_openidconnect_state: (Option<PendingLogin>, bool),
    verified_student: (Option<String>, bool),
}

impl Session {
    pub fn new(headers: &HeaderMap) -> Self {
        let mut csrf_token = None;
        let mut openidconnect_session = None;
        let mut temporary_openidconnect_state = None;
        let mut verified_student = None;
        headers
            .get_all(COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .flat_map(Cookie::split_parse_encoded)
            .filter_map(Result::ok)
            .filter(|cookie| !cookie.value().is_empty())
            .for_each(|cookie| match cookie.name() {
                COOKIE_NAME_CSRF_TOKEN => csrf_token = Some(cookie.value().to_owned()),
                COOKIE_NAME_OPENIDCONNECT_SESSION => {
                    openidconnect_session = Some(cookie.value().to_owned());
                }
                COOKIE_NAME_TEMPORARY_OPENIDCONNECT_STATE => {
                    match serde_json::from_str(cookie.value()) {
                        Ok(state) => temporary_openidconnect_state = Some(state),
                        Err(err) => debug!("failed to parse pending login cookie: {err}"),
                    }
                }
                COOKIE_NAME_VERIFIED_STUDENT => {
                    verified_student = Some(cookie.value().to_owned());
                }
                _ => {
                    // ignore the cookies that are not interesting for us
                }
            });
        let csrf_token = csrf_token.map_or_else(
            || {
                (
                    thread_rng()
                        .sample_iter(&rand::distributions::Alphanumeric)
                        .take(30)
                        .map(char::from)
                        .collect(),
                    true,
                )
            },
            |token| (token, false),
        );
        Self {
            csrf_token,
            openidconnect_session: (openidconnect_session, false),
            temporary_openidconnect_state: (temporary_openidconnect_state, false),
            verified_student: (verified_student, false),
        }
    }

    #[must_use]
    pub fn csrf_token(&self) -> String {
        self.csrf_token.0.clone()
    }

    #[must_use]
    pub fn openidconnect_session(&self) -> Option<&str> {
        self.openidconnect_session.0.as_deref()
    }

    pub fn with_openidconnect_session(mut self, id_token: String) -> Self {
        self.openidconnect_session = (Some(id_token), true);
        self
    }

    pub fn without_openidconnect_session(mut self) -> Self {
        if self.openidconnect_session.0.is_some() {
            self.openidconnect_session = (None, true);
        }
        self
    }

    pub fn with_temporary_openidconnect_state(mut self, pending: PendingLogin) -> Self {
        self.temporary_openidconnect_state = (Some(pending), true);
        self
    }

    pub fn get_and_remove_temporary_openidconnect_state(
        mut self,
    ) -> Result<(PendingLogin, Self), AppError> {
        match self.temporary_openidconnect_state.0.take() {
            Some(pending) => {
                self.temporary_openidconnect_state.1 = true;
                Ok((pending, self))
            }
            None => Err(AppError::OpenIdTokenNotFound),
        }
    }

    /// The student ID that passed the eligibility check in this browser.
    #[must_use]
    pub fn verified_student(&self) -> Option<&str> {
        self.verified_student.0.as_deref()
    }

    pub fn with_verified_student(mut self, student_id: String) -> Self {
        self.verified_student = (Some(student_id), true);
        self
    }

    pub fn without_verified_student(mut self) -> Self {
        if self.verified_student.0.is_some() {
            self.verified_student = (None, true);
        }
        self
    }
}

fn set_cookie_header(name: &'static str, value: Option<String>) -> String {
    let removal = value.is_none();
    let mut cookie = Cookie::build((name, value.unwrap_or_default()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    if removal {
        cookie.make_removal();
    }
    cookie.encoded().to_string()
}

pub trait ResponseSessionExt {
    #[must_use]
    fn with_session(self, session: Session) -> Self;
}

impl ResponseSessionExt for http::response::Builder {
    fn with_session(self, session: Session) -> Self {
        let mut this = self;
        if let (value, true) = session.csrf_token {
            this = this.header(SET_COOKIE, set_cookie_header(COOKIE_NAME_CSRF_TOKEN, Some(value)));
        }
        if let (value, true) = session.openidconnect_session {
            this = this.header(
                SET_COOKIE,
                set_cookie_header(COOKIE_NAME_OPENIDCONNECT_SESSION, value),
            );
        }
        if let (value, true) = session.temporary_openidconnect_state {
            let value = value.and_then(|pending| match serde_json::to_string(&pending) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!("failed to serialize pending login: {err}");
                    None
                }
            });
            this = this.header(
                SET_COOKIE,
                set_cookie_header(COOKIE_NAME_TEMPORARY_OPENIDCONNECT_STATE, value),
            );
        }
        if let (value, true) = session.verified_student {
            this = this.header(
                SET_COOKIE,
                set_cookie_header(COOKIE_NAME_VERIFIED_STUDENT, value),
            );
        }
        this
    }
}
