//! Backend client: the BaaS capability surface consumed by the session layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! `Backend` is the seam between session orchestration and the hosted
//! platform. `PocketBaseClient` implements it over HTTP; tests substitute an
//! in-memory backend. Records cross the seam as raw JSON and are decoded at
//! the call site with [`types::decode`], which keeps the trait object safe.

pub mod auth_store;
pub mod pocketbase;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

use reqwest::Method;
use serde_json::Value;

pub use auth_store::{AuthStore, token_claims};
pub use pocketbase::PocketBaseClient;
pub use types::{ApiError, AuthResponse, FieldError, ListOptions, MenuItem, UserRecord, decode};

use crate::filter::Filter;

/// Remote operations the session layer relies on.
///
/// `auth_with_password` saves the issued token into [`Backend::auth_store`].
/// `auth_refresh` only returns the new credential; the caller stores it.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// The persisted credential used to authorize requests.
    fn auth_store(&self) -> &AuthStore;

    async fn auth_with_password(
        &self,
        collection: &str,
        identity: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError>;

    /// Refresh the current credential, optionally expanding relations.
    ///
    /// Authorizes with the stored token but leaves the store untouched.
    async fn auth_refresh(&self, collection: &str, expand: Option<&str>) -> Result<AuthResponse, ApiError>;

    /// Send an arbitrary request to a backend path such as `/api/me`.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError>;

    /// Fetch every record matching `options`, following pagination.
    async fn get_full_list(&self, collection: &str, options: &ListOptions) -> Result<Vec<Value>, ApiError>;

    /// First record matching `filter`; a 404 response error when none match.
    async fn get_first_list_item(&self, collection: &str, filter: &Filter) -> Result<Value, ApiError>;

    async fn get_one(&self, collection: &str, id: &str, expand: Option<&str>) -> Result<Value, ApiError>;

    async fn create(&self, collection: &str, data: &Value) -> Result<Value, ApiError>;

    async fn update(&self, collection: &str, id: &str, data: &Value) -> Result<Value, ApiError>;

    async fn request_verification(&self, collection: &str, email: &str) -> Result<(), ApiError>;

    async fn request_email_change(&self, collection: &str, new_email: &str) -> Result<(), ApiError>;

    async fn confirm_email_change(&self, collection: &str, token: &str, password: &str) -> Result<(), ApiError>;

    async fn request_password_reset(&self, collection: &str, email: &str) -> Result<(), ApiError>;

    async fn confirm_password_reset(
        &self,
        collection: &str,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(), ApiError>;
}

/// `GET /api/me`: the authenticated user with its role expanded server-side.
///
/// # Errors
///
/// Returns the backend error, or [`ApiError::Parse`] for an unexpected body.
pub async fn fetch_me(backend: &dyn Backend) -> Result<UserRecord, ApiError> {
    let body = backend.send(Method::GET, "/api/me", None).await?;
    decode(body)
}
