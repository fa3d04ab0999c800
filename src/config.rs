//! Portal configuration parsed from environment variables.

use std::path::PathBuf;

use crate::messages::Locale;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";
pub const DEFAULT_USERS_COLLECTION: &str = "users";
pub const DEFAULT_CREDENTIAL_PATH: &str = ".portal/auth.json";
pub const DEFAULT_PREFERENCES_PATH: &str = ".portal/preferences.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Settings the session store reads at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Collection used when no realm is given or recorded.
    pub users_collection: String,
    /// Role assigned on registration; looked up by name when absent.
    pub default_role_id: Option<String>,
    pub locale: Locale,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { users_collection: DEFAULT_USERS_COLLECTION.to_owned(), default_role_id: None, locale: Locale::En }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub session: SessionConfig,
    pub credential_path: PathBuf,
    pub preferences_path: PathBuf,
    pub timeouts: ClientTimeouts,
}

impl PortalConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORTAL_BASE_URL`: default `http://127.0.0.1:8090`
    /// - `PORTAL_USERS_COLLECTION`: default `users`
    /// - `PORTAL_DEFAULT_ROLE_ID`: looked up by role name when unset
    /// - `PORTAL_LOCALE`: `en` (default) or `es`
    /// - `PORTAL_CREDENTIAL_PATH`: default `.portal/auth.json`
    /// - `PORTAL_PREFERENCES_PATH`: default `.portal/preferences.json`
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown locale or an empty collection name.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_non_empty("PORTAL_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let users_collection = match std::env::var("PORTAL_USERS_COLLECTION") {
            Ok(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::Parse("PORTAL_USERS_COLLECTION is empty".into()));
            }
            Ok(raw) => raw.trim().to_owned(),
            Err(_) => DEFAULT_USERS_COLLECTION.to_owned(),
        };
        let locale = parse_locale(env_non_empty("PORTAL_LOCALE").as_deref())?;
        let session = SessionConfig { users_collection, default_role_id: env_non_empty("PORTAL_DEFAULT_ROLE_ID"), locale };

        let credential_path =
            PathBuf::from(env_non_empty("PORTAL_CREDENTIAL_PATH").unwrap_or_else(|| DEFAULT_CREDENTIAL_PATH.into()));
        let preferences_path =
            PathBuf::from(env_non_empty("PORTAL_PREFERENCES_PATH").unwrap_or_else(|| DEFAULT_PREFERENCES_PATH.into()));
        let timeouts = ClientTimeouts {
            request_secs: env_parse_u64("PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, session, credential_path, preferences_path, timeouts })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_locale(raw: Option<&str>) -> Result<Locale, ConfigError> {
    match raw.map(str::to_ascii_lowercase).as_deref().unwrap_or("en") {
        "en" => Ok(Locale::En),
        "es" => Ok(Locale::Es),
        other => Err(ConfigError::Parse(format!("unknown PORTAL_LOCALE: {other}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
