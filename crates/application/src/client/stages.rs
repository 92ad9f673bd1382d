//! The stages that make a pipeline authenticated.

use std::sync::Arc;

use async_trait::async_trait;
use deadline_domain::ApiRequest;
use tracing::{debug, info, warn};

use super::{
    DispatchOutcome, RequestContext, RequestStage, ResponseAction, ResponseStage, SignOutHook,
    TokenSource,
};

/// Attaches `Authorization: Bearer <token>` when a token is available.
///
/// Without a token the request goes out unauthenticated.
pub struct BearerTokenStage {
    tokens: Arc<dyn TokenSource>,
}

impl BearerTokenStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl RequestStage for BearerTokenStage {
    async fn on_request(&self, mut request: ApiRequest, ctx: &RequestContext) -> ApiRequest {
        match self.tokens.token(false).await {
            Some(token) => request.set_bearer(&token),
            None => debug!(request_id = %ctx.id, "no token, sending unauthenticated"),
        }
        request
    }
}

/// On a 401, refreshes the token and asks for one retry.
///
/// If the request was already retried, or no fresh token can be had,
/// the session is signed out and the 401 is passed on.
pub struct RefreshOnUnauthorized {
    tokens: Arc<dyn TokenSource>,
    sign_out: Arc<dyn SignOutHook>,
}

impl RefreshOnUnauthorized {
    /// Creates the stage.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenSource>, sign_out: Arc<dyn SignOutHook>) -> Self {
        Self { tokens, sign_out }
    }

    async fn give_up(&self, ctx: &RequestContext) {
        info!(request_id = %ctx.id, "credentials rejected, signing out");
        if let Err(e) = self.sign_out.sign_out().await {
            warn!(request_id = %ctx.id, error = %e, "sign-out after 401 failed");
        }
    }
}

#[async_trait]
impl ResponseStage for RefreshOnUnauthorized {
    async fn on_response(
        &self,
        request: &ApiRequest,
        outcome: DispatchOutcome,
        ctx: &RequestContext,
    ) -> ResponseAction {
        let unauthorized = matches!(&outcome, Err(failure) if failure.is_unauthorized());
        if !unauthorized {
            return ResponseAction::Pass(outcome);
        }

        if !ctx.retried
            && let Some(token) = self.tokens.token(true).await
        {
            debug!(request_id = %ctx.id, "401, retrying with refreshed token");
            let mut retry = request.clone();
            retry.set_bearer(&token);
            return ResponseAction::Retry(retry);
        }

        self.give_up(ctx).await;
        ResponseAction::Pass(outcome)
    }
}
