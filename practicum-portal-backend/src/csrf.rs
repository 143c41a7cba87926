use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::session::Session;

/// Forms that carry the double-submit token of the session cookie.
pub trait CsrfToken {
    fn csrf_token(&self) -> &str;
}

/// Parses an urlencoded POST body and rejects it unless its token matches the session.
pub fn csrf_safe_form<T>(body: &[u8], session: &Session) -> Result<T, AppError>
where
    T: DeserializeOwned + CsrfToken,
{
    let form: T = serde_urlencoded::from_bytes(body)?;
    if form.csrf_token() != session.csrf_token() {
        return Err(AppError::WrongCsrfToken);
    }
    Ok(form)
}

/// A form with no fields besides the token.
#[derive(serde::Deserialize)]
pub struct TokenOnly {
    csrf_token: String,
}

impl CsrfToken for TokenOnly {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}
