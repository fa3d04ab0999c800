//! Session operation errors.

use crate::api::ApiError;

/// Validation code the backend reports for a uniqueness conflict.
pub const NOT_UNIQUE: &str = "validation_not_unique";

/// Errors surfaced to callers of user-initiated session operations.
///
/// `init` never returns one; refresh failures are absorbed there.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account not verified")]
    Unverified,

    #[error("too many attempts")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("email already in use")]
    EmailTaken,

    #[error("username already in use")]
    UsernameTaken,

    #[error("phone number already in use")]
    PhoneTaken,

    #[error("default 'user' role not found")]
    DefaultRoleMissing,

    /// Raised before any remote call.
    #[error("not authenticated")]
    Unauthenticated,

    #[error("could not request the email change")]
    EmailChangeRequestFailed,

    #[error("token invalid or expired, or password incorrect")]
    EmailChangeConfirmFailed,

    #[error("could not start the password reset")]
    PasswordResetRequestFailed,

    #[error("token invalid or expired")]
    PasswordResetConfirmFailed,

    /// A logout or dispose started while the operation was in flight.
    #[error("operation superseded by a newer session change")]
    Superseded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    /// Classify a password-auth failure.
    #[must_use]
    pub fn from_login(err: ApiError) -> Self {
        match err {
            ApiError::Transport(detail) => Self::Network(detail),
            ApiError::Response { status: 400 | 401 | 404, .. } => Self::InvalidCredentials,
            ApiError::Response { status: 403, .. } => Self::Unverified,
            ApiError::Response { status: 429, .. } => Self::RateLimited,
            other => Self::Api(other),
        }
    }

    /// Translate uniqueness conflicts on registration, checked email first.
    #[must_use]
    pub fn from_registration(err: ApiError) -> Self {
        let conflict = |field: &str| err.field_code(field) == Some(NOT_UNIQUE);
        if conflict("email") {
            Self::EmailTaken
        } else if conflict("username") {
            Self::UsernameTaken
        } else if conflict("phone") {
            Self::PhoneTaken
        } else {
            Self::Api(err)
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod tests;
