//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the record source the `/api/me` hook reads from. Production uses
//! [`PocketBaseSource`]; tests inject an in-memory source.

use std::sync::Arc;

use portal::api::{ApiError, AuthStore, Backend, PocketBaseClient, token_claims};
use portal::config::ClientTimeouts;
use serde_json::Value;

/// Collection holding role records.
pub const ROLES_COLLECTION: &str = "roles";

/// Reads auth and role records on behalf of one request token.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Validate `token` and return the auth record it belongs to.
    async fn authenticate(&self, token: &str) -> Result<Value, ApiError>;

    /// Load a role record with the caller's authorization.
    async fn role(&self, token: &str, role_id: &str) -> Result<Value, ApiError>;
}

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RecordSource>,
}

impl AppState {
    #[must_use]
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }
}

/// Record source backed by the PocketBase REST API.
///
/// Each call builds a short-lived client holding only the caller's token;
/// the HTTP connection pool is shared.
pub struct PocketBaseSource {
    http: reqwest::Client,
    base_url: String,
    users_collection: String,
}

impl PocketBaseSource {
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, users_collection: &str, timeouts: ClientTimeouts) -> Result<Self, ApiError> {
        let http = portal::api::pocketbase::build_http(timeouts)?;
        // Reject a bad base URL at startup.
        PocketBaseClient::from_parts(http.clone(), base_url, AuthStore::new())?;
        Ok(Self { http, base_url: base_url.to_owned(), users_collection: users_collection.to_owned() })
    }

    fn client_for(&self, token: &str) -> Result<PocketBaseClient, ApiError> {
        let auth = AuthStore::new();
        auth.save(token, None);
        PocketBaseClient::from_parts(self.http.clone(), &self.base_url, auth)
    }
}

#[async_trait::async_trait]
impl RecordSource for PocketBaseSource {
    async fn authenticate(&self, token: &str) -> Result<Value, ApiError> {
        let collection = token_collection(token).unwrap_or_else(|| self.users_collection.clone());
        let response = self.client_for(token)?.auth_refresh(&collection, None).await?;
        Ok(response.record)
    }

    async fn role(&self, token: &str, role_id: &str) -> Result<Value, ApiError> {
        self.client_for(token)?.get_one(ROLES_COLLECTION, role_id, None).await
    }
}

/// Collection id carried in an auth token's claims.
pub(crate) fn token_collection(token: &str) -> Option<String> {
    token_claims(token)?
        .get("collectionId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
