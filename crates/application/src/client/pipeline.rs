//! Ordered request/response stage pipeline over a transport.

use std::sync::Arc;

use deadline_domain::{ApiRequest, ApiResponse, NormalizedError, TransportFailure};
use tracing::{Instrument, debug, debug_span};

use super::{DispatchOutcome, RequestContext, RequestStage, ResponseAction, ResponseStage};
use crate::ports::Transport;

/// Runs a request through its stages and the transport.
///
/// A logical request is dispatched at most twice, whatever the stages ask.
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl Pipeline {
    /// Creates a pipeline with no stages.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            request_stages: Vec::new(),
            response_stages: Vec::new(),
        }
    }

    /// Appends a request stage.
    #[must_use]
    pub fn with_request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.request_stages.push(stage);
        self
    }

    /// Appends a response stage.
    #[must_use]
    pub fn with_response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.response_stages.push(stage);
        self
    }

    /// Sends `request` and returns the final response.
    ///
    /// # Errors
    ///
    /// Returns the `NormalizedError` for whatever failure remains after the
    /// response stages have run.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, NormalizedError> {
        let ctx = RequestContext::new();
        let span = debug_span!(
            "api_request",
            request_id = %ctx.id,
            method = %request.method,
            path = %request.path,
        );
        self.run(request, ctx)
            .instrument(span)
            .await
            .map_err(NormalizedError::from)
    }

    async fn run(
        &self,
        mut request: ApiRequest,
        mut ctx: RequestContext,
    ) -> Result<ApiResponse, TransportFailure> {
        for stage in &self.request_stages {
            request = stage.on_request(request, &ctx).await;
        }

        let mut outcome = self.dispatch(&request, &mut ctx).await;
        'stages: loop {
            for stage in &self.response_stages {
                match stage.on_response(&request, outcome, &ctx).await {
                    ResponseAction::Pass(passed) => outcome = passed,
                    ResponseAction::Retry(retry) => {
                        if ctx.retried {
                            return Err(TransportFailure::unexpected(
                                "retry requested after the retry was spent",
                            ));
                        }
                        ctx.retried = true;
                        request = retry;
                        outcome = self.dispatch(&request, &mut ctx).await;
                        continue 'stages;
                    }
                }
            }
            return outcome;
        }
    }

    async fn dispatch(&self, request: &ApiRequest, ctx: &mut RequestContext) -> DispatchOutcome {
        ctx.dispatches += 1;
        let outcome = self.transport.dispatch(request).await;
        match &outcome {
            Ok(response) => debug!(
                dispatch = ctx.dispatches,
                status = response.status,
                elapsed_ms = u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX),
                "dispatched"
            ),
            Err(failure) => debug!(dispatch = ctx.dispatches, %failure, "dispatch failed"),
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, unauthorized};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Tag(&'static str);

    #[async_trait]
    impl RequestStage for Tag {
        async fn on_request(&self, request: ApiRequest, _ctx: &RequestContext) -> ApiRequest {
            let seen = request.header("X-Stages").unwrap_or_default().to_string();
            request.with_header("X-Stages", format!("{seen}{}", self.0))
        }
    }

    /// Asks for a retry on every outcome.
    struct AlwaysRetry;

    #[async_trait]
    impl ResponseStage for AlwaysRetry {
        async fn on_response(
            &self,
            request: &ApiRequest,
            _outcome: DispatchOutcome,
            _ctx: &RequestContext,
        ) -> ResponseAction {
            ResponseAction::Retry(request.clone())
        }
    }

    #[tokio::test]
    async fn test_request_stages_run_in_order() {
        let transport = Arc::new(ScriptedTransport::ok());
        let pipeline = Pipeline::new(transport.clone())
            .with_request_stage(Arc::new(Tag("a")))
            .with_request_stage(Arc::new(Tag("b")));

        pipeline.send(ApiRequest::get("/workspaces/")).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("x-stages"), Some("ab"));
    }

    #[tokio::test]
    async fn test_failure_is_normalized() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TransportFailure::rejected(
            404,
            br#"{"detail": "Not found."}"#,
        ))]));
        let pipeline = Pipeline::new(transport);

        let error = pipeline.send(ApiRequest::get("/x/")).await.unwrap_err();
        assert_eq!(error.code(), "404");
        assert_eq!(error.message(), "Not found.");
    }

    #[tokio::test]
    async fn test_unauthorized_without_stages_is_final() {
        let transport = Arc::new(ScriptedTransport::new(vec![unauthorized()]));
        let pipeline = Pipeline::new(transport.clone());

        let error = pipeline.send(ApiRequest::get("/x/")).await.unwrap_err();
        assert_eq!(error.code(), "token_expired");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_at_most_one_retry() {
        let transport = Arc::new(ScriptedTransport::ok());
        let pipeline = Pipeline::new(transport.clone()).with_response_stage(Arc::new(AlwaysRetry));

        let error = pipeline.send(ApiRequest::get("/x/")).await.unwrap_err();
        assert_eq!(error.code(), NormalizedError::UNKNOWN);
        assert_eq!(transport.requests().len(), 2);
    }
}
