//! Authentication errors surfaced by sign-in and sign-up.

use thiserror::Error;

/// Errors from `sign_in` / `sign_up`.
///
/// Classified from the identity provider's error *code*, never from
/// its message text, so classification does not depend on locale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown account or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Password rejected by the provider's password policy.
    #[error("password does not meet the password policy")]
    WeakPassword,

    /// Sign-up with an email that already has an account.
    #[error("email already in use")]
    EmailInUse,

    /// Anything the classifier does not recognise.
    #[error("authentication failed ({code}): {message}")]
    Unknown {
        /// Upstream error code, or a local code such as `NETWORK_ERROR`.
        code: String,
        /// Upstream message, kept for logs and fallback display.
        message: String,
    },
}

impl AuthError {
    /// Classifies an upstream error code.
    ///
    /// Accepts both SDK-style codes (`auth/wrong-password`) and REST-style
    /// codes, including ones with a trailing description
    /// (`WEAK_PASSWORD : Password should be at least 6 characters`).
    #[must_use]
    pub fn from_upstream(code: &str, message: impl Into<String>) -> Self {
        let token = code.split(" : ").next().unwrap_or(code).trim();
        match token {
            "auth/wrong-password"
            | "auth/user-not-found"
            | "auth/invalid-credential"
            | "auth/invalid-login-credentials"
            | "INVALID_PASSWORD"
            | "EMAIL_NOT_FOUND"
            | "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredentials,
            "auth/weak-password" | "WEAK_PASSWORD" => Self::WeakPassword,
            "auth/email-already-in-use" | "EMAIL_EXISTS" => Self::EmailInUse,
            other => Self::Unknown {
                code: other.to_string(),
                message: message.into(),
            },
        }
    }

    /// Error for an identity provider that could not be reached.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Unknown {
            code: "NETWORK_ERROR".to_string(),
            message: message.into(),
        }
    }

    /// Stable code for the error kind.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::WeakPassword => "weak_password",
            Self::EmailInUse => "email_in_use",
            Self::Unknown { code, .. } => code,
        }
    }

    /// Text suitable for showing next to a sign-in form.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::InvalidCredentials => "Invalid email or password",
            Self::WeakPassword => "Password too weak",
            Self::EmailInUse => "Email already in use",
            Self::Unknown { message, .. } if !message.is_empty() => message,
            Self::Unknown { .. } => "Authentication failed",
        }
    }
}
