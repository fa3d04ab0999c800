//! User-presentable messages for session errors.
//!
//! `Display` on [`SessionError`] is the English text used in logs. UIs call
//! [`user_message`] to get the text for the configured locale; raw backend
//! detail never reaches it.

use crate::session::SessionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Es,
}

/// Fixed, localized message for `err`.
#[must_use]
pub fn user_message(err: &SessionError, locale: Locale) -> &'static str {
    match locale {
        Locale::En => english(err),
        Locale::Es => spanish(err),
    }
}

fn english(err: &SessionError) -> &'static str {
    match err {
        SessionError::InvalidCredentials => "Invalid email/username or password.",
        SessionError::Unverified => "Please verify your email before signing in.",
        SessionError::RateLimited => "Too many attempts. Please try again later.",
        SessionError::Network(_) => "Could not reach the server. Check your connection.",
        SessionError::EmailTaken => "This email address is already in use.",
        SessionError::UsernameTaken => "This username is already in use.",
        SessionError::PhoneTaken => "This phone number is already in use.",
        SessionError::DefaultRoleMissing => "Registration is unavailable: the default 'user' role is missing.",
        SessionError::Unauthenticated => "You are not signed in.",
        SessionError::EmailChangeRequestFailed => "Could not request the email change. Please try again.",
        SessionError::EmailChangeConfirmFailed => "The token is invalid or expired, or the password is incorrect.",
        SessionError::PasswordResetRequestFailed => "Could not start the password reset.",
        SessionError::PasswordResetConfirmFailed => {
            "The token is invalid or has expired. Please request a new password reset."
        }
        SessionError::Superseded => "Your session changed while this was in progress. Please try again.",
        SessionError::Api(_) => "The request could not be completed.",
    }
}

fn spanish(err: &SessionError) -> &'static str {
    match err {
        SessionError::InvalidCredentials => "Correo/usuario o contraseña incorrectos.",
        SessionError::Unverified => "Verifica tu correo electrónico antes de iniciar sesión.",
        SessionError::RateLimited => "Demasiados intentos. Inténtalo más tarde.",
        SessionError::Network(_) => "No se pudo contactar con el servidor. Revisa tu conexión.",
        SessionError::EmailTaken => "Este correo electrónico ya está en uso.",
        SessionError::UsernameTaken => "Este nombre de usuario ya está en uso.",
        SessionError::PhoneTaken => "Este número de teléfono ya está en uso.",
        SessionError::DefaultRoleMissing => "No se encontró el rol 'user' por defecto.",
        SessionError::Unauthenticated => "Usuario no autenticado.",
        SessionError::EmailChangeRequestFailed => "No se pudo solicitar el cambio de email. Inténtalo de nuevo.",
        SessionError::EmailChangeConfirmFailed => "El token es inválido, ha expirado o la contraseña es incorrecta.",
        SessionError::PasswordResetRequestFailed => "No se pudo iniciar el proceso de reseteo de contraseña.",
        SessionError::PasswordResetConfirmFailed => {
            "El token es inválido o ha expirado. Por favor, solicita un nuevo reseteo."
        }
        SessionError::Superseded => "La sesión cambió mientras se procesaba la solicitud. Inténtalo de nuevo.",
        SessionError::Api(_) => "No se pudo completar la solicitud.",
    }
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;
