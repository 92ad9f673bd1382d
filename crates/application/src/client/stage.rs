//! Pipeline stage traits.

use async_trait::async_trait;
use deadline_domain::{ApiRequest, ApiResponse, TransportFailure};

use super::RequestContext;

/// Result of a single dispatch.
pub type DispatchOutcome = Result<ApiResponse, TransportFailure>;

/// What a response stage wants done with an outcome.
#[derive(Debug)]
pub enum ResponseAction {
    /// Hand the outcome to the next stage, or to the caller.
    Pass(DispatchOutcome),
    /// Dispatch this request again instead.
    Retry(ApiRequest),
}

/// Decorates a request before it is dispatched.
#[async_trait]
pub trait RequestStage: Send + Sync {
    /// Returns the request to dispatch.
    async fn on_request(&self, request: ApiRequest, ctx: &RequestContext) -> ApiRequest;
}

/// Inspects the outcome of a dispatch.
#[async_trait]
pub trait ResponseStage: Send + Sync {
    /// Decides what happens to `outcome`.
    ///
    /// `request` is the request that produced it, as it went on the wire.
    async fn on_response(
        &self,
        request: &ApiRequest,
        outcome: DispatchOutcome,
        ctx: &RequestContext,
    ) -> ResponseAction;
}
