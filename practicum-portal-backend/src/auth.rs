use async_trait::async_trait;
use practicum_portal_config::Config;
use practicum_portal_openidconnect::{
    begin_authentication, finish_authentication, id_token_claims, OpenIdRedirect,
    OpenIdRedirectSuccess,
};
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::session::Session;
use crate::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

/// The external login provider.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the url to send the browser to and the state to keep until the callback.
    async fn begin(&self) -> Result<(String, String), AppError>;

    /// Completes a login and returns the token to store in the session.
    async fn finish(
        &self,
        state: &str,
        redirect: OpenIdRedirect<OpenIdRedirectSuccess>,
    ) -> Result<String, AppError>;

    /// `None` when the token is invalid or expired.
    async fn current_user(&self, token: &str) -> Option<AuthenticatedUser>;
}

pub struct OpenIdAuthenticator {
    config: Config,
}

impl OpenIdAuthenticator {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Authenticator for OpenIdAuthenticator {
    async fn begin(&self) -> Result<(String, String), AppError> {
        let (auth_url, openid_session) = begin_authentication(&self.config).await?;
        Ok((auth_url, serde_json::to_string(&openid_session)?))
    }

    async fn finish(
        &self,
        state: &str,
        redirect: OpenIdRedirect<OpenIdRedirectSuccess>,
    ) -> Result<String, AppError> {
        let openid_session = serde_json::from_str(state)?;
        Ok(finish_authentication(&self.config, openid_session, redirect).await?)
    }

    async fn current_user(&self, token: &str) -> Option<AuthenticatedUser> {
        match id_token_claims(&self.config, token).await {
            Ok(claims) => Some(AuthenticatedUser {
                id: claims.subject,
                email: claims.email,
            }),
            Err(err) => {
                debug!("ignoring openid session: {err}");
                None
            }
        }
    }
}

pub async fn current_user(state: &AppState, session: &Session) -> Option<AuthenticatedUser> {
    match session.openidconnect_session() {
        Some(token) => state.authenticator.current_user(token).await,
        None => None,
    }
}
