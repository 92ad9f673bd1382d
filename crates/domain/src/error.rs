//! Domain error types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::failure::TransportFailure;

/// Domain-level errors that can occur while building requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The request body could not be serialized.
    #[error("invalid body: {0}")]
    InvalidBody(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// The single error shape every API caller handles.
///
/// Built once from a [`TransportFailure`] (or a local failure) and never
/// modified afterwards; fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct NormalizedError {
    code: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl NormalizedError {
    /// Code used when no response was received.
    pub const NETWORK_ERROR: &'static str = "NETWORK_ERROR";
    /// Code used for malformed or unexpected failures.
    pub const UNKNOWN: &'static str = "UNKNOWN";

    const NETWORK_MESSAGE: &'static str = "Network error: verify connectivity";
    const FALLBACK_MESSAGE: &'static str = "Unexpected error";

    /// Creates an error with a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates an `UNKNOWN` error.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::new(Self::UNKNOWN, "Unknown error")
        } else {
            Self::new(Self::UNKNOWN, message)
        }
    }

    /// Creates a `NETWORK_ERROR` with the fixed advisory message.
    #[must_use]
    pub fn network() -> Self {
        Self::new(Self::NETWORK_ERROR, Self::NETWORK_MESSAGE)
    }

    /// Machine-readable code; never empty.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Upstream structured error payload, if any.
    #[must_use]
    pub const fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Returns true for connectivity failures.
    #[must_use]
    pub fn is_network(&self) -> bool {
        self.code == Self::NETWORK_ERROR
    }
}

impl From<TransportFailure> for NormalizedError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Rejected { status, payload } => {
                let payload = payload.unwrap_or_default();
                let code = payload
                    .code
                    .as_ref()
                    .map(ToString::to_string)
                    .or_else(|| payload.message.clone())
                    .unwrap_or_else(|| status.to_string());
                let message = payload
                    .message
                    .clone()
                    .or_else(|| payload.detail_text().map(str::to_string))
                    .unwrap_or_else(|| Self::FALLBACK_MESSAGE.to_string());
                let details = payload.errors.or(payload.detail);

                Self {
                    code,
                    message,
                    details,
                }
            }
            TransportFailure::Network { .. } => Self::network(),
            TransportFailure::Unexpected { message } => Self::unknown(message),
        }
    }
}

impl From<DomainError> for NormalizedError {
    fn from(error: DomainError) -> Self {
        Self::unknown(error.to_string())
    }
}
