//! Session store for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! UI code reads the session through `SessionStore` accessors or a watch
//! subscription and mutates it only through the operations below. The
//! credential itself lives in the backend's `AuthStore`; this layer refreshes
//! it, clears it, and derives the navigation menu from the user's role.
//!
//! CONCURRENCY
//! ===========
//! Operations never lock against each other. Every `init` takes a generation
//! number and commits only if nothing newer has started; `logout` and
//! `dispose` also advance a logout epoch so an in-flight login cannot
//! resurrect a session that was ended meanwhile. A refreshed token is saved
//! inside the same commit as the session it belongs to, and `logout` clears
//! the credential under that lock too, so the session and the persisted
//! credential always move together. `AuthStore` listeners therefore run
//! while the session is locked and must not read it. `is_loading` is
//! derived from an in-flight counter held by [`LoadingGuard`], so the first
//! task to finish does not clear the flag for the others, and a dropped
//! future still releases it.

pub mod errors;
pub mod nav;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;

pub use errors::SessionError;

use crate::api::{ApiError, Backend, MenuItem, UserRecord, decode};
use crate::config::SessionConfig;
use crate::filter::Filter;
use crate::router::{HOME_ROUTE, Navigator};

/// Relations expanded when refreshing the user.
pub const USER_EXPAND: &str = "role.permissions";
pub const ROLES_COLLECTION: &str = "roles";
pub const DEFAULT_ROLE_NAME: &str = "user";
const AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

// =============================================================================
// SESSION
// =============================================================================

/// Snapshot of the session as seen by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub current_user: Option<UserRecord>,
    pub is_loading: bool,
    pub nav_items: Vec<MenuItem>,
}

impl Session {
    fn initial() -> Self {
        Self { current_user: None, is_loading: true, nav_items: Vec::new() }
    }

    fn sign_out(&mut self) {
        self.current_user = None;
        self.nav_items.clear();
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    #[must_use]
    pub fn permission_keys(&self) -> Vec<String> {
        self.current_user
            .as_ref()
            .map(UserRecord::permission_keys)
            .unwrap_or_default()
    }

    /// True when the user holds every key in `required`.
    ///
    /// An empty `required` is always satisfied, even when signed out.
    #[must_use]
    pub fn has_permissions(&self, required: &[&str]) -> bool {
        if required.is_empty() {
            return true;
        }
        if self.current_user.is_none() {
            return false;
        }
        let keys = self.permission_keys();
        required.iter().all(|r| keys.iter().any(|k| k == r))
    }
}

struct Refreshed {
    token: String,
    record: Value,
    user: UserRecord,
    nav_items: Vec<MenuItem>,
}

/// Input for [`SessionStore::register`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub phone: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    backend: Arc<dyn Backend>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    state: watch::Sender<Session>,
    generation: AtomicU64,
    logout_epoch: AtomicU64,
    in_flight: AtomicUsize,
    disposed: AtomicBool,
}

/// Holds `is_loading` true for the lifetime of one operation.
struct LoadingGuard<'a> {
    store: &'a SessionStore,
}

impl<'a> LoadingGuard<'a> {
    fn begin(store: &'a SessionStore) -> Self {
        store.in_flight.fetch_add(1, Ordering::SeqCst);
        store.state.send_modify(|s| s.is_loading = true);
        Self { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let store = self.store;
        store.in_flight.fetch_sub(1, Ordering::SeqCst);
        store
            .state
            .send_modify(|s| s.is_loading = store.in_flight.load(Ordering::SeqCst) > 0);
    }
}

impl SessionStore {
    /// Create a store in the initial state: signed out and loading.
    #[must_use]
    pub fn create(backend: Arc<dyn Backend>, navigator: Arc<dyn Navigator>, config: SessionConfig) -> Arc<Self> {
        let (state, _) = watch::channel(Session::initial());
        Arc::new(Self {
            backend,
            navigator,
            config,
            state,
            generation: AtomicU64::new(0),
            logout_epoch: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        })
    }

    /// Detach the store: in-flight results are discarded and the state is
    /// reset. The persisted credential is left alone.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.supersede();
        self.state.send_modify(|s| {
            s.sign_out();
            s.is_loading = false;
        });
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserRecord> {
        self.state.borrow().current_user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn nav_items(&self) -> Vec<MenuItem> {
        self.state.borrow().nav_items.clone()
    }

    #[must_use]
    pub fn permission_keys(&self) -> Vec<String> {
        self.state.borrow().permission_keys()
    }

    #[must_use]
    pub fn has_permissions(&self, required: &[&str]) -> bool {
        self.state.borrow().has_permissions(required)
    }

    // =========================================================================
    // SESSION LIFECYCLE
    // =========================================================================

    /// Hydrate the session from the persisted credential.
    ///
    /// Never fails: a missing, expired or rejected credential leaves the
    /// session signed out and the credential cleared.
    pub async fn init(&self) {
        let _loading = LoadingGuard::begin(self);
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_disposed() {
            return;
        }

        let auth = self.backend.auth_store();
        if !auth.is_valid() {
            self.commit(ticket, |s| {
                if !auth.token().is_empty() && !auth.is_valid() {
                    tracing::debug!("discarding expired credential");
                    auth.clear();
                }
                s.sign_out();
            });
            return;
        }

        match self.refresh().await {
            Ok(Refreshed { token, record, user, nav_items }) => {
                let user_id = user.id.clone();
                let items = nav_items.len();
                // The refreshed token is stored only together with the session it belongs to.
                let committed = self.commit(ticket, move |s| {
                    auth.save(&token, Some(record));
                    s.current_user = Some(user);
                    s.nav_items = nav_items;
                });
                if committed {
                    tracing::debug!(%user_id, items, "session refreshed");
                } else {
                    tracing::debug!(ticket, %user_id, "superseded session refresh discarded");
                }
            }
            Err(e) => {
                let committed = self.commit(ticket, |s| {
                    auth.clear();
                    s.sign_out();
                });
                if committed {
                    tracing::warn!(error = %e, "session refresh failed; signing out");
                } else {
                    tracing::debug!(ticket, error = %e, "superseded session refresh failed");
                }
            }
        }
    }

    async fn refresh(&self) -> Result<Refreshed, ApiError> {
        let realm = self.credential_realm();
        let response = self.backend.auth_refresh(&realm, Some(USER_EXPAND)).await?;
        let user: UserRecord = decode(response.record.clone())?;
        let keys = user.permission_keys();
        let nav_items = nav::fetch_nav_items(self.backend.as_ref(), &keys).await?;
        Ok(Refreshed { token: response.token, record: response.record, user, nav_items })
    }

    /// Authenticate against `realm` and hydrate the session.
    ///
    /// # Errors
    ///
    /// Returns a classified auth error, or [`SessionError::Superseded`] when
    /// a logout started before authentication finished.
    pub async fn login(&self, identity: &str, secret: &str, realm: &str) -> Result<(), SessionError> {
        self.ensure_live()?;
        let _loading = LoadingGuard::begin(self);
        let epoch = self.logout_epoch.load(Ordering::SeqCst);

        let response = match self.backend.auth_with_password(realm, identity, secret).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, realm, "login failed");
                return Err(SessionError::from_login(e));
            }
        };

        if self.logout_epoch.load(Ordering::SeqCst) != epoch {
            let auth = self.backend.auth_store();
            if auth.token() == response.token {
                auth.clear();
            }
            return Err(SessionError::Superseded);
        }

        self.init().await;
        Ok(())
    }

    /// End the session locally and return to the home route.
    pub fn logout(&self) {
        self.supersede();
        let auth = self.backend.auth_store();
        self.state.send_modify(|s| {
            auth.clear();
            s.sign_out();
            s.is_loading = self.in_flight.load(Ordering::SeqCst) > 0;
        });
        tracing::info!("signed out");
        self.navigator.goto(HOME_ROUTE);
    }

    // =========================================================================
    // ACCOUNT OPERATIONS
    // =========================================================================

    /// Create a user with the default role and request email verification.
    ///
    /// Does not sign the new user in.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken`, `UsernameTaken` or `PhoneTaken` for uniqueness
    /// conflicts, `DefaultRoleMissing` when no role can be assigned, and
    /// `Api` for anything else.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), SessionError> {
        self.ensure_live()?;
        let _loading = LoadingGuard::begin(self);
        let result = self.register_inner(request).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, username = %request.username, "registration failed");
        }
        result
    }

    async fn register_inner(&self, request: &RegisterRequest) -> Result<(), SessionError> {
        let role_id = self.default_role_id().await?;
        let data = json!({
            "email": request.email,
            "username": request.username,
            "phone": request.phone,
            "password": request.password,
            "passwordConfirm": request.password_confirm,
            "role": role_id,
            "avatar": avatar_url(&request.username)?,
        });

        let users = &self.config.users_collection;
        self.backend
            .create(users, &data)
            .await
            .map_err(SessionError::from_registration)?;
        self.backend
            .request_verification(users, &request.email)
            .await
            .map_err(SessionError::from_registration)?;
        tracing::info!(username = %request.username, "user registered; verification requested");
        Ok(())
    }

    async fn default_role_id(&self) -> Result<String, SessionError> {
        if let Some(id) = &self.config.default_role_id {
            return Ok(id.clone());
        }
        let filter = Filter::eq("name", DEFAULT_ROLE_NAME);
        match self.backend.get_first_list_item(ROLES_COLLECTION, &filter).await {
            Ok(role) => role
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .ok_or(SessionError::DefaultRoleMissing),
            Err(e) if e.status() == Some(404) => Err(SessionError::DefaultRoleMissing),
            Err(e) => Err(SessionError::Api(e)),
        }
    }

    /// Patch a user record, then refresh the session.
    ///
    /// # Errors
    ///
    /// Backend errors propagate unchanged as [`SessionError::Api`].
    pub async fn update_profile(&self, user_id: &str, realm: &str, patch: &Value) -> Result<(), SessionError> {
        self.ensure_live()?;
        let _loading = LoadingGuard::begin(self);
        self.backend.update(realm, user_id, patch).await?;
        self.init().await;
        Ok(())
    }

    /// # Errors
    ///
    /// `Unauthenticated` without a session, `EmailChangeRequestFailed` when
    /// the backend rejects the request.
    pub async fn request_email_change(&self, new_email: &str) -> Result<(), SessionError> {
        let realm = self.require_user_realm()?;
        self.backend
            .request_email_change(&realm, new_email)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "email change request failed");
                SessionError::EmailChangeRequestFailed
            })
    }

    /// Confirm an email change and refresh the session's email.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a session, `EmailChangeConfirmFailed` when
    /// the token or password is rejected.
    pub async fn confirm_email_change(&self, token: &str, password: &str) -> Result<(), SessionError> {
        let realm = self.require_user_realm()?;
        self.backend
            .confirm_email_change(&realm, token, password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "email change confirmation failed");
                SessionError::EmailChangeConfirmFailed
            })?;
        self.init().await;
        Ok(())
    }

    /// # Errors
    ///
    /// `PasswordResetRequestFailed` when the backend rejects the request.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), SessionError> {
        self.backend
            .request_password_reset(&self.config.users_collection, email)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password reset request failed");
                SessionError::PasswordResetRequestFailed
            })
    }

    /// # Errors
    ///
    /// `PasswordResetConfirmFailed` when the token is invalid or expired.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(), SessionError> {
        self.backend
            .confirm_password_reset(&self.config.users_collection, token, password, password_confirm)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password reset confirmation failed");
                SessionError::PasswordResetConfirmFailed
            })
    }

    /// `GET /api/me` through the backend.
    ///
    /// # Errors
    ///
    /// Backend errors propagate as [`SessionError::Api`].
    pub async fn fetch_me(&self) -> Result<UserRecord, SessionError> {
        Ok(crate::api::fetch_me(self.backend.as_ref()).await?)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn supersede(&self) {
        self.logout_epoch.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket && !self.is_disposed()
    }

    /// Apply `update` if `ticket` is still the newest generation.
    ///
    /// The check runs under the watch lock, so a concurrent `logout` either
    /// lands first (and this is skipped) or overwrites afterwards.
    fn commit(&self, ticket: u64, update: impl FnOnce(&mut Session)) -> bool {
        self.state.send_if_modified(|s| {
            if !self.is_current(ticket) {
                return false;
            }
            update(s);
            true
        })
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_disposed() { Err(SessionError::Superseded) } else { Ok(()) }
    }

    fn credential_realm(&self) -> String {
        self.backend
            .auth_store()
            .collection_name()
            .unwrap_or_else(|| self.config.users_collection.clone())
    }

    fn require_user_realm(&self) -> Result<String, SessionError> {
        let state = self.state.borrow();
        let user = state.current_user.as_ref().ok_or(SessionError::Unauthenticated)?;
        if user.collection_name.is_empty() {
            Ok(self.config.users_collection.clone())
        } else {
            Ok(user.collection_name.clone())
        }
    }
}

/// Generated default avatar for a new user.
///
/// # Errors
///
/// Returns [`ApiError::Url`] if the avatar URL cannot be built.
pub fn avatar_url(username: &str) -> Result<String, ApiError> {
    Url::parse_with_params(AVATAR_BASE_URL, &[("name", username), ("rounded", "true"), ("size", "128")])
        .map(String::from)
        .map_err(|e| ApiError::Url(e.to_string()))
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
