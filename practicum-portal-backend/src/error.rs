use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use http_body_util::Full;
use practicum_portal_config::ConfigError;
use practicum_portal_database::DatabaseError;
use practicum_portal_openidconnect::error::OpenIdConnectError;
use serde::Serialize;

use crate::session::{ResponseSessionExt as _, Session};
use crate::templating::{TemplateWrapper, Templates};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("form error: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("url encoding error: {0}")]
    UrlEncode(#[from] serde_urlencoded::ser::Error),
    #[error("webserver error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("request body error: {0}")]
    Body(Box<dyn std::error::Error + Send + Sync>),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("http error: {0}")]
    Http(#[from] http::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("openid connect error: {0}")]
    OpenIdConnect(#[from] OpenIdConnectError),
    #[error("wrong csrf token")]
    WrongCsrfToken,
    #[error(
        "Your login session most likely expired and you need to try again. If this happens \
         again, please report the problem to a server administrator."
    )]
    OpenIdTokenNotFound,
}

#[derive(Serialize)]
struct ErrorPage {
    status: u16,
    error: String,
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::WrongCsrfToken | Self::Form(_) | Self::OpenIdTokenNotFound => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error page. Falls back to plain text when the template itself fails.
    pub fn build_error_template(
        self,
        templates: &Templates,
        session: Session,
    ) -> Response<Full<Bytes>> {
        let status = self.status();
        let page = ErrorPage {
            status: status.as_u16(),
            error: self.to_string(),
        };
        let csrf_token = session.csrf_token();
        let body = templates
            .render(
                "error",
                &TemplateWrapper::new(&csrf_token, "Error", &page),
            )
            .unwrap_or_else(|render_error| format!("{status}: {}\n{render_error}", page.error));
        Response::builder()
            .with_session(session)
            .status(status)
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| {
                let mut response =
                    Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
                *response.status_mut() = status;
                response
            })
    }
}
