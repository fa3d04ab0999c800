//! Persisted credential for the backend client.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend issues a JWT on password auth and on refresh. `AuthStore`
//! keeps that token plus the raw auth record, optionally mirrored to a JSON
//! credential file so a later process starts with the same session. Password
//! auth saves here directly; a refreshed token is saved by the session layer
//! when it commits the matching user.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

type ChangeListener = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCredential {
    #[serde(default)]
    token: String,
    #[serde(default)]
    record: Option<Value>,
}

/// Token store with change notifications.
#[derive(Default)]
pub struct AuthStore {
    state: RwLock<StoredCredential>,
    listeners: Mutex<Vec<ChangeListener>>,
    path: Option<PathBuf>,
}

impl AuthStore {
    /// In-memory store with no backing file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by a credential file, loading it when present.
    ///
    /// An unreadable or malformed file starts the store empty.
    #[must_use]
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load_credential(&path).unwrap_or_default();
        Self { state: RwLock::new(state), listeners: Mutex::new(Vec::new()), path: Some(path) }
    }

    /// Current token, empty when signed out.
    #[must_use]
    pub fn token(&self) -> String {
        self.state.read().map(|s| s.token.clone()).unwrap_or_default()
    }

    /// Raw auth record saved with the token.
    #[must_use]
    pub fn record(&self) -> Option<Value> {
        self.state.read().ok().and_then(|s| s.record.clone())
    }

    /// Collection the saved record belongs to.
    #[must_use]
    pub fn collection_name(&self) -> Option<String> {
        self.record()
            .and_then(|r| r.get("collectionName").and_then(Value::as_str).map(str::to_owned))
            .filter(|name| !name.is_empty())
    }

    /// True when a token is present and its `exp` claim lies in the future.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let token = self.token();
        !token.is_empty() && !token_expired(&token, unix_now())
    }

    pub fn save(&self, token: &str, record: Option<Value>) {
        if let Ok(mut state) = self.state.write() {
            state.token = token.to_owned();
            state.record = record;
            self.persist(&state);
        }
        self.notify(token);
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            *state = StoredCredential::default();
            if let Some(path) = &self.path {
                if let Err(e) = std::fs::remove_file(path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(error = %e, path = %path.display(), "credential file removal failed");
                    }
                }
            }
        }
        self.notify("");
    }

    /// Register a callback invoked with the new token after every change.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Arc::new(listener));
        }
    }

    fn notify(&self, token: &str) {
        // Snapshot so a listener may touch the store without deadlocking.
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default();
        for listener in listeners {
            listener(token);
        }
    }

    fn persist(&self, state: &StoredCredential) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, path = %parent.display(), "credential directory creation failed");
                    return;
                }
            }
        }
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "credential serialization failed");
                return;
            }
        };
        if let Err(e) = std::fs::write(path, raw) {
            tracing::warn!(error = %e, path = %path.display(), "credential file write failed");
        }
    }
}

fn load_credential(path: &Path) -> Option<StoredCredential> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "ignoring malformed credential file");
            None
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Decode a JWT payload without verifying its signature.
#[must_use]
pub fn token_claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub(crate) fn token_expiry(token: &str) -> Option<u64> {
    token_claims(token)?.get("exp").and_then(Value::as_u64)
}

/// Tokens that are not JWTs or carry no `exp` count as expired.
pub(crate) fn token_expired(token: &str, now: u64) -> bool {
    token_expiry(token).is_none_or(|exp| exp <= now)
}

#[cfg(test)]
#[path = "auth_store_test.rs"]
mod tests;
