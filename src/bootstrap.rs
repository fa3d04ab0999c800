//! Process start-up wiring.
//!
//! Builds the backend client, router, theme store and session store, then
//! runs theme init followed by session init. A credential listener logs every
//! token change; navigation stays with the session store.

use std::sync::Arc;

use crate::api::{ApiError, AuthStore, Backend, PocketBaseClient};
use crate::config::{PortalConfig, SessionConfig};
use crate::router::Router;
use crate::session::SessionStore;
use crate::theme::ThemeStore;

pub struct App {
    pub backend: Arc<dyn Backend>,
    pub router: Arc<Router>,
    pub theme: ThemeStore,
    pub session: Arc<SessionStore>,
}

impl App {
    /// Wire the application from environment config and hydrate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built. Session hydration itself never fails.
    pub async fn bootstrap(config: &PortalConfig) -> Result<Self, ApiError> {
        let auth = AuthStore::with_file(&config.credential_path);
        let client = PocketBaseClient::new(&config.base_url, config.timeouts, auth)?;
        tracing::info!(base_url = %client.base_url(), "backend client ready");
        let theme = ThemeStore::new(&config.preferences_path);
        let app = Self::assemble(Arc::new(client), theme, config.session.clone());
        app.start().await;
        Ok(app)
    }

    /// Wire around an existing backend without touching it.
    #[must_use]
    pub fn assemble(backend: Arc<dyn Backend>, theme: ThemeStore, session: SessionConfig) -> Self {
        let router = Arc::new(Router::new());
        backend.auth_store().on_change(|token| {
            tracing::debug!(signed_in = !token.is_empty(), "credential changed");
        });
        let session = SessionStore::create(Arc::clone(&backend), router.clone(), session);
        Self { backend, router, theme, session }
    }

    /// Theme init, then session init.
    pub async fn start(&self) {
        let theme = self.theme.init();
        self.session.init().await;
        tracing::info!(
            theme = theme.as_str(),
            authenticated = self.session.is_authenticated(),
            "app started"
        );
    }
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
