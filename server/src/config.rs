//! Server configuration parsed from environment variables.

use portal::config::{ClientTimeouts, DEFAULT_BASE_URL, DEFAULT_USERS_COLLECTION};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Backend the hook validates tokens against.
    pub base_url: String,
    /// Auth collection used when a token carries no `collectionId`.
    pub users_collection: String,
    pub timeouts: ClientTimeouts,
}

impl ServerConfig {
    /// Optional:
    /// - `PORT`: default 3000
    /// - `PORTAL_BASE_URL`: default `http://127.0.0.1:8090`
    /// - `PORTAL_USERS_COLLECTION`: default `users`
    /// - `PORTAL_REQUEST_TIMEOUT_SECS` / `PORTAL_CONNECT_TIMEOUT_SECS`
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` or a timeout is set but not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ClientTimeouts::default();
        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT)?,
            base_url: env_or("PORTAL_BASE_URL", DEFAULT_BASE_URL).trim_end_matches('/').to_owned(),
            users_collection: env_or("PORTAL_USERS_COLLECTION", DEFAULT_USERS_COLLECTION),
            timeouts: ClientTimeouts {
                request_secs: env_parse("PORTAL_REQUEST_TIMEOUT_SECS", defaults.request_secs)?,
                connect_secs: env_parse("PORTAL_CONNECT_TIMEOUT_SECS", defaults.connect_secs)?,
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
