//! A successful response from the remote API.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::failure::TransportFailure;

/// Response received from the remote API.
///
/// The transport only hands out 2xx responses as `ApiResponse`; every
/// other status becomes a [`TransportFailure::Rejected`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Time from dispatch to last body byte.
    pub duration: Duration,
}

impl ApiResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
            duration: Duration::ZERO,
        }
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true if the body is empty (e.g. `204 No Content`).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `TransportFailure::Unexpected` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportFailure> {
        serde_json::from_slice(&self.body).map_err(|e| {
            TransportFailure::unexpected(format!("unexpected response body: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_json_decode() {
        let response = ApiResponse::new(200, br#"[{"id": 1}, {"id": 2}]"#.to_vec());
        let items: Vec<Item> = response.json().unwrap_or_default();
        assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn test_json_shape_mismatch_is_unexpected() {
        let response = ApiResponse::new(200, br#"{"id": "one"}"#.to_vec());
        let result = response.json::<Item>();
        assert!(matches!(result, Err(TransportFailure::Unexpected { .. })));
    }

    #[test]
    fn test_no_content() {
        let response = ApiResponse::new(204, Vec::new());
        assert!(response.is_success());
        assert!(response.is_empty());
        assert!(!ApiResponse::new(302, Vec::new()).is_success());
    }
}
