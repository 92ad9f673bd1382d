//! Transport port

use async_trait::async_trait;
use deadline_domain::{ApiRequest, ApiResponse, TransportFailure};

/// Port for putting a request on the wire.
///
/// Implementations decode every failure into a [`TransportFailure`]
/// before returning: non-2xx statuses become `Rejected`, missing
/// responses become `Network`, anything else `Unexpected`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` once and returns the 2xx response or the failure.
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, TransportFailure>;
}
