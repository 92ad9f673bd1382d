//! Transport failures, decoded once at the transport boundary.
//!
//! Everything past the transport works with the closed set of variants
//! in [`TransportFailure`]; nothing downstream re-inspects raw bodies.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// An upstream error code, which some backends send as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// Textual code such as `"not_found"`.
    Text(String),
    /// Numeric code such as `404`, kept as sent.
    Number(Number),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// The recognised fields of an error response body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-readable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form detail; a string for most backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    /// Structured validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl ErrorPayload {
    /// Decodes a response body.
    ///
    /// Returns `None` when the body is empty, not JSON, or not an object.
    /// Bodies wrapped as `{"error": {...}}` are unwrapped first.
    #[must_use]
    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        match serde_json::from_slice::<Value>(body).ok()? {
            Value::Object(map) => Some(Self::from_object(map)),
            _ => None,
        }
    }

    fn from_object(mut map: Map<String, Value>) -> Self {
        if !map.contains_key("code")
            && !map.contains_key("message")
            && let Some(Value::Object(inner)) = map.remove("error")
        {
            return Self::from_object(inner);
        }

        let code = match map.remove("code") {
            Some(Value::String(text)) if !text.is_empty() => Some(ErrorCode::Text(text)),
            Some(Value::Number(number)) => Some(ErrorCode::Number(number)),
            _ => None,
        };
        let message = match map.remove("message") {
            Some(Value::String(text)) if !text.is_empty() => Some(text),
            _ => None,
        };
        let detail = map.remove("detail").filter(|v| !is_blank(v));
        let errors = map.remove("errors").filter(|v| !is_blank(v));

        Self {
            code,
            message,
            detail,
            errors,
        }
    }

    /// The detail field when it is a non-empty string.
    #[must_use]
    pub fn detail_text(&self) -> Option<&str> {
        self.detail.as_ref().and_then(Value::as_str)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// Why a dispatched request did not produce a successful response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportFailure {
    /// A response arrived with a non-2xx status.
    #[error("server responded with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Decoded error body, if it had a recognisable shape.
        payload: Option<ErrorPayload>,
    },

    /// No response was received.
    #[error("network error: {message}")]
    Network {
        /// Transport-level description.
        message: String,
    },

    /// Anything else: bad URLs, undecodable bodies, programming errors.
    #[error("unexpected failure: {message}")]
    Unexpected {
        /// Description of what went wrong.
        message: String,
    },
}

impl TransportFailure {
    /// Builds a rejection from a status code and raw body.
    #[must_use]
    pub fn rejected(status: u16, body: &[u8]) -> Self {
        Self::Rejected {
            status,
            payload: ErrorPayload::decode(body),
        }
    }

    /// Builds a network failure.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Builds an unexpected failure.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// HTTP status, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a 401 response.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401, .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_full_payload() {
        let body = json!({
            "code": "validation_error",
            "message": "Name is required",
            "errors": {"name": ["required"]}
        })
        .to_string();

        let payload = ErrorPayload::decode(body.as_bytes()).unwrap();
        assert_eq!(
            payload.code,
            Some(ErrorCode::Text("validation_error".to_string()))
        );
        assert_eq!(payload.message.as_deref(), Some("Name is required"));
        assert_eq!(payload.errors, Some(json!({"name": ["required"]})));
        assert!(payload.detail.is_none());
    }

    #[test]
    fn test_decode_numeric_code_and_detail() {
        let payload = ErrorPayload::decode(br#"{"code": 42, "detail": "Not found."}"#).unwrap();
        assert_eq!(payload.code, Some(ErrorCode::Number(42.into())));
        assert_eq!(payload.detail_text(), Some("Not found."));
    }

    #[test]
    fn test_decode_numeric_code_outside_i64() {
        let payload = ErrorPayload::decode(br#"{"code": 18446744073709551615}"#).unwrap();
        assert_eq!(
            payload.code.map(|code| code.to_string()).as_deref(),
            Some("18446744073709551615")
        );

        let payload = ErrorPayload::decode(br#"{"code": 4.5}"#).unwrap();
        assert_eq!(payload.code.map(|code| code.to_string()).as_deref(), Some("4.5"));
    }

    #[test]
    fn test_decode_wrapped_error_object() {
        let payload =
            ErrorPayload::decode(br#"{"error": {"code": 400, "message": "EMAIL_EXISTS"}}"#)
                .unwrap();
        assert_eq!(payload.code, Some(ErrorCode::Number(400.into())));
        assert_eq!(payload.message.as_deref(), Some("EMAIL_EXISTS"));
    }

    #[test]
    fn test_decode_unrecognised_bodies() {
        assert!(ErrorPayload::decode(b"").is_none());
        assert!(ErrorPayload::decode(b"<html>Bad Gateway</html>").is_none());
        assert!(ErrorPayload::decode(b"[1, 2]").is_none());
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let payload = ErrorPayload::decode(br#"{"code": "", "message": ""}"#).unwrap();
        assert_eq!(payload, ErrorPayload::default());
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(TransportFailure::rejected(401, b"").is_unauthorized());
        assert!(!TransportFailure::rejected(403, b"").is_unauthorized());
        assert!(!TransportFailure::network("reset").is_unauthorized());
        assert_eq!(TransportFailure::rejected(500, b"").status(), Some(500));
        assert_eq!(TransportFailure::unexpected("x").status(), None);
    }
}
