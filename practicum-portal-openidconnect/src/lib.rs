pub mod error;

use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthorizationCode, ClientId, ClientSecret, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    Scope, TokenResponse as _,
};
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreIdToken, CoreProviderMetadata};
use openidconnect::{AccessTokenHash, IssuerUrl, Nonce, TokenResponse};
use practicum_portal_config::Config;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::OpenIdConnectError;

pub const REDIRECT_PATH: &str = "/openidconnect-redirect";

#[derive(Deserialize)]
pub struct OpenIdRedirect<T> {
    pub state: String,
    #[serde(flatten)]
    pub inner: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum OpenIdRedirectInner {
    Error(OpenIdRedirectError),
    Success(OpenIdRedirectSuccess),
}

#[derive(Deserialize, Serialize)]
pub struct OpenIdRedirectError {
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

#[derive(Deserialize, Serialize)]
pub struct OpenIdRedirectSuccess {
    pub code: String,
}

/// Kept in a cookie between the login redirect and the callback.
#[derive(Serialize, Deserialize)]
pub struct OpenIdSession {
    pub verifier: PkceCodeVerifier,
    pub nonce: Nonce,
    pub csrf_token: oauth2::CsrfToken,
}

/// The parts of a verified id token the portal cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserClaims {
    pub subject: String,
    pub email: Option<String>,
}

static OPENID_CLIENT: OnceCell<CoreClient> = OnceCell::const_new();

pub async fn get_openid_client(config: &Config) -> Result<&'static CoreClient, OpenIdConnectError> {
    OPENID_CLIENT
        .get_or_try_init(|| async {
            info!(issuer = %config.openidconnect.issuer_url, "discovering openid provider");
            let provider_metadata = CoreProviderMetadata::discover_async(
                IssuerUrl::new(config.openidconnect.issuer_url.clone())?,
                async_http_client,
            )
            .await?;

            let client = CoreClient::from_provider_metadata(
                provider_metadata,
                ClientId::new(config.openidconnect.client_id.clone()),
                Some(ClientSecret::new(
                    config.openidconnect.client_secret.clone(),
                )),
            )
            .set_redirect_uri(RedirectUrl::new(format!(
                "{}{REDIRECT_PATH}",
                config.url
            ))?);
            Ok(client)
        })
        .await
}

pub async fn begin_authentication(
    config: &Config,
) -> Result<(String, OpenIdSession), OpenIdConnectError> {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, csrf_token, nonce) = get_openid_client(config)
        .await?
        .authorize_url(
            CoreAuthenticationFlow::AuthorizationCode,
            oauth2::CsrfToken::new_random,
            Nonce::new_random,
        )
        .add_scope(Scope::new("email".to_owned()))
        .set_pkce_challenge(pkce_challenge)
        .url();

    Ok((
        auth_url.to_string(),
        OpenIdSession {
            verifier: pkce_verifier,
            nonce,
            csrf_token,
        },
    ))
}

/// Exchanges the authorization code and returns the serialized, verified id token.
pub async fn finish_authentication(
    config: &Config,
    session: OpenIdSession,
    input: OpenIdRedirect<OpenIdRedirectSuccess>,
) -> Result<String, OpenIdConnectError> {
    if &input.state != session.csrf_token.secret() {
        return Err(OpenIdConnectError::WrongCsrfToken);
    };

    let client = get_openid_client(config).await?;

    let token_response = client
        .exchange_code(AuthorizationCode::new(input.inner.code))
        .set_pkce_verifier(session.verifier)
        .request_async(async_http_client)
        .await?;

    let id_token = token_response
        .id_token()
        .ok_or(OpenIdConnectError::NoIdTokenReturned)?;
    let claims = id_token.claims(&client.id_token_verifier(), &session.nonce)?;

    // the access token must belong to this id token
    if let Some(expected_access_token_hash) = claims.access_token_hash() {
        let actual_access_token_hash =
            AccessTokenHash::from_token(token_response.access_token(), &id_token.signing_alg()?)?;
        if actual_access_token_hash != *expected_access_token_hash {
            return Err(OpenIdConnectError::InvalidAccessToken);
        }
    }

    debug!(subject = %claims.subject().as_str(), "finished openid authentication");

    Ok(serde_json::to_string(id_token)?)
}

/// Verifies a stored id token. Fails once the token expired.
pub async fn id_token_claims(
    config: &Config,
    id_token: &str,
) -> Result<UserClaims, OpenIdConnectError> {
    let client = get_openid_client(config).await?;

    let id_token: CoreIdToken = serde_json::from_str(id_token)?;
    let claims = id_token.claims(&client.id_token_verifier(), |_nonce: Option<&Nonce>| Ok(()))?;
    Ok(UserClaims {
        subject: claims.subject().as_str().to_owned(),
        email: claims.email().map(|email| email.as_str().to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_query_with_code_is_a_success() {
        let redirect: OpenIdRedirect<OpenIdRedirectInner> =
            serde_urlencoded::from_str("state=abc&session_state=xyz&code=the-code").unwrap();
        assert_eq!(redirect.state, "abc");
        assert!(matches!(
            redirect.inner,
            OpenIdRedirectInner::Success(OpenIdRedirectSuccess { ref code }) if code == "the-code"
        ));
    }

    #[test]
    fn redirect_query_with_error_is_an_error() {
        let redirect: OpenIdRedirect<OpenIdRedirectInner> = serde_urlencoded::from_str(
            "state=abc&error=access_denied&error_description=User+cancelled",
        )
        .unwrap();
        match redirect.inner {
            OpenIdRedirectInner::Error(error) => {
                assert_eq!(error.error, "access_denied");
                assert_eq!(error.error_description, "User cancelled");
            }
            OpenIdRedirectInner::Success(_) => panic!("expected an error redirect"),
        }
    }
}
