use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "practicum.toml";
pub const ENV_PREFIX: &str = "PRACTICUM_";

#[derive(Deserialize, Clone, Debug)]
pub struct OpenIdConnectConfig {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// Public base url without a trailing slash, used for the openid redirect.
    pub url: String,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    pub database_url: String,
    #[serde(default = "default_map_embed_url")]
    pub map_embed_url: String,
    pub openidconnect: OpenIdConnectConfig,
}

fn default_listen_address() -> String {
    "0.0.0.0:3000".to_owned()
}

fn default_map_embed_url() -> String {
    "https://www.openstreetmap.org/export/embed.html".to_owned()
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
}

/// `PRACTICUM_OPENIDCONNECT__CLIENT_ID` sets `openidconnect.client_id`.
#[must_use]
pub fn figment() -> Figment {
    Figment::new()
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(figment().extract()?)
}
