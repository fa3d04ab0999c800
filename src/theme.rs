//! Light/dark preference.
//!
//! The preference is one key (`app-theme`) in a small JSON preferences file.
//! Other keys in that file are preserved on write. A missing file or an
//! unknown value reads as light.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

pub const THEME_KEY: &str = "app-theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Parse a stored value; anything unrecognized is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("preferences io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preferences encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Observable theme preference.
pub struct ThemeStore {
    state: watch::Sender<Theme>,
    path: Option<PathBuf>,
}

impl ThemeStore {
    /// Store persisting to `path`. Starts light until [`ThemeStore::init`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (state, _) = watch::channel(Theme::default());
        Self { state, path: Some(path.into()) }
    }

    /// Store that never touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        let (state, _) = watch::channel(Theme::default());
        Self { state, path: None }
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.state.subscribe()
    }

    /// Load the saved preference, falling back to light.
    pub fn init(&self) -> Theme {
        let theme = self
            .path
            .as_deref()
            .and_then(read_preferences)
            .and_then(|prefs| prefs.get(THEME_KEY).and_then(Value::as_str).and_then(Theme::parse))
            .unwrap_or_default();
        tracing::debug!(theme = theme.as_str(), "theme loaded");
        self.state.send_replace(theme);
        theme
    }

    /// Switch to `theme` and persist it.
    ///
    /// # Errors
    ///
    /// Returns a [`ThemeError`] if the preferences file cannot be written.
    /// The in-memory theme is updated regardless.
    pub fn set_theme(&self, theme: Theme) -> Result<(), ThemeError> {
        self.state.send_replace(theme);
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut prefs = read_preferences(path).unwrap_or_default();
        prefs.insert(THEME_KEY.to_owned(), Value::String(theme.as_str().to_owned()));
        write_preferences(path, &prefs)
    }

    /// Flip between light and dark.
    ///
    /// # Errors
    ///
    /// See [`ThemeStore::set_theme`].
    pub fn toggle(&self) -> Result<Theme, ThemeError> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}

fn read_preferences(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => {
            tracing::warn!(path = %path.display(), "ignoring malformed preferences file");
            None
        }
    }
}

fn write_preferences(path: &Path, prefs: &Map<String, Value>) -> Result<(), ThemeError> {
    let io_err = |source| ThemeError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_string_pretty(prefs)?;
    std::fs::write(path, body).map_err(io_err)
}

#[cfg(test)]
#[path = "theme_test.rs"]
mod tests;
