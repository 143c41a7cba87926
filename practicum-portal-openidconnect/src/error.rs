use oauth2::reqwest::AsyncHttpClientError;
use oauth2::{RequestTokenError, StandardErrorResponse};
use openidconnect::core::CoreErrorResponseType;
use openidconnect::{
    ClaimsVerificationError, DiscoveryError, SignatureVerificationError, SigningError,
};

#[derive(thiserror::Error, Debug)]
pub enum OpenIdConnectError {
    #[error("request token error: {0}")]
    RequestToken(
        #[from]
        RequestTokenError<AsyncHttpClientError, StandardErrorResponse<CoreErrorResponseType>>,
    ),
    #[error("claims verification error: {0}")]
    ClaimsVerification(#[from] ClaimsVerificationError),
    #[error("openid signing error: {0}")]
    Signing(#[from] SigningError),
    #[error("signature verification error: {0}")]
    SignatureVerification(#[from] SignatureVerificationError),
    #[error("oauth error: {0}")]
    Oauth2Parse(#[from] oauth2::url::ParseError),
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError<AsyncHttpClientError>),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("wrong csrf token")]
    WrongCsrfToken,
    #[error("server did not return id token")]
    NoIdTokenReturned,
    #[error("invalid access token")]
    InvalidAccessToken,
}
