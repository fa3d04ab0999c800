//! Client-side navigation target.
//!
//! SYSTEM CONTEXT
//! ==============
//! Logout sends the UI back to `/`. Session operations navigate through
//! `Navigator` so the store does not depend on a concrete router.

use tokio::sync::watch;

pub const HOME_ROUTE: &str = "/";

pub trait Navigator: Send + Sync {
    fn goto(&self, path: &str);
}

/// Router holding the current route in a watch channel.
pub struct Router {
    current: watch::Sender<String>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(HOME_ROUTE.to_owned());
        Self { current }
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for Router {
    fn goto(&self, path: &str) {
        tracing::debug!(path, "navigate");
        self.current.send_replace(path.to_owned());
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
