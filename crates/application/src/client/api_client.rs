//! JSON convenience layer over the authenticated pipeline.

use std::sync::Arc;

use deadline_domain::{ApiRequest, ApiResponse, NormalizedError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{BearerTokenStage, Pipeline, RefreshOnUnauthorized};
use crate::ports::Transport;
use crate::session::SessionProvider;

/// Client for the remote resource API.
///
/// Every call returns either the decoded body or a [`NormalizedError`].
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<Pipeline>,
}

impl ApiClient {
    /// Wraps an already assembled pipeline.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Builds the standard authenticated client: bearer injection on the
    /// way out, one refresh-and-retry on 401 on the way back.
    #[must_use]
    pub fn authenticated(transport: Arc<dyn Transport>, session: Arc<SessionProvider>) -> Self {
        let pipeline = Pipeline::new(transport)
            .with_request_stage(Arc::new(BearerTokenStage::new(session.clone())))
            .with_response_stage(Arc::new(RefreshOnUnauthorized::new(
                session.clone(),
                session,
            )));
        Self::new(pipeline)
    }

    /// Sends a prepared request.
    ///
    /// # Errors
    ///
    /// Returns a `NormalizedError` for any failure.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, NormalizedError> {
        self.pipeline.send(request).await
    }

    /// Sends a request and decodes the JSON response.
    ///
    /// An empty body decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns a `NormalizedError` for any failure, including a body that
    /// does not decode as `T` (`UNKNOWN`).
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, NormalizedError> {
        let response = self.send(request).await?;
        if response.is_empty() {
            return serde_json::from_value(Value::Null)
                .map_err(|e| NormalizedError::unknown(format!("unexpected empty body: {e}")));
        }
        Ok(response.json()?)
    }

    /// GETs `path`, with optional query parameters.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, NormalizedError> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |request, (k, v)| {
                request.with_query(k, v)
            });
        self.send_json(request).await
    }

    /// POSTs `body` as JSON to `path`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, NormalizedError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).with_json(body)?).await
    }

    /// PUTs `body` as JSON to `path`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, NormalizedError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::put(path).with_json(body)?).await
    }

    /// PATCHes `path` with `body` as JSON.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, NormalizedError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::patch(path).with_json(body)?).await
    }

    /// DELETEs `path`, discarding any body.
    ///
    /// # Errors
    ///
    /// Returns a `NormalizedError` for any failure.
    pub async fn delete(&self, path: &str) -> Result<(), NormalizedError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::{FakeIdentityProvider, ManualClock, ScriptedTransport, unauthorized};
    use deadline_domain::{SessionStatus, TransportFailure};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Harness {
        identity: Arc<FakeIdentityProvider>,
        transport: Arc<ScriptedTransport>,
        session: Arc<SessionProvider>,
        client: ApiClient,
    }

    async fn harness(
        identity: FakeIdentityProvider,
        script: Vec<Result<ApiResponse, TransportFailure>>,
    ) -> Harness {
        let identity = Arc::new(identity);
        let transport = Arc::new(ScriptedTransport::new(script));
        let session = SessionProvider::start(identity.clone(), Arc::new(ManualClock::new()));
        session.wait_until_resolved().await;
        let client = ApiClient::authenticated(transport.clone(), session.clone());
        Harness {
            identity,
            transport,
            session,
            client,
        }
    }

    fn signed_in() -> FakeIdentityProvider {
        FakeIdentityProvider::new()
            .with_account("ada@example.com", "secret-pw")
            .signed_in("ada@example.com")
    }

    fn ok(body: &serde_json::Value) -> Result<ApiResponse, TransportFailure> {
        Ok(ApiResponse::new(200, body.to_string().into_bytes()))
    }

    #[tokio::test]
    async fn test_bearer_injected() {
        let h = harness(signed_in(), vec![ok(&json!([]))]).await;

        let _: Value = h.client.get_json("/workspaces/", &[]).await.unwrap();

        let sent = h.transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bearer(), Some("uid-ada@example.com-token-1"));
    }

    #[tokio::test]
    async fn test_anonymous_requests_go_out_without_credentials() {
        let h = harness(FakeIdentityProvider::new(), vec![ok(&json!({"up": true}))]).await;

        let body: Value = h.client.get_json("/health/", &[]).await.unwrap();
        assert_eq!(body, json!({"up": true}));
        assert_eq!(h.transport.requests()[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_refresh_then_success_is_observed_as_success() {
        let h = harness(signed_in(), vec![unauthorized(), ok(&json!({"id": 3}))]).await;

        let body: Value = h.client.get_json("/artifacts/3/", &[]).await.unwrap();
        assert_eq!(body, json!({"id": 3}));

        let sent = h.transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].bearer(), Some("uid-ada@example.com-token-1"));
        assert_eq!(sent[1].bearer(), Some("uid-ada@example.com-token-2"));
        assert_eq!(h.identity.forced_fetches(), 1);
        assert_eq!(h.identity.sign_outs(), 0);
        assert!(h.session.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_retry_failure_is_final() {
        let h = harness(
            signed_in(),
            vec![
                unauthorized(),
                Err(TransportFailure::rejected(
                    403,
                    br#"{"code": "forbidden", "message": "No access"}"#,
                )),
            ],
        )
        .await;

        let error = h.client.delete("/artifacts/3/").await.unwrap_err();
        assert_eq!(error.code(), "forbidden");
        assert_eq!(h.transport.requests().len(), 2);
        assert_eq!(h.identity.sign_outs(), 0);
    }

    #[tokio::test]
    async fn test_second_401_signs_out_once_without_third_attempt() {
        let h = harness(signed_in(), vec![unauthorized(), unauthorized(), ok(&json!({}))]).await;

        let error = h.client.delete("/workspaces/9/").await.unwrap_err();

        assert_eq!(error.code(), "token_expired");
        assert_eq!(error.message(), "Token expired");
        assert_eq!(h.transport.requests().len(), 2);
        assert_eq!(h.identity.sign_outs(), 1);
        assert_eq!(h.session.session().status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_401_without_refresh_signs_out() {
        let h = harness(signed_in(), vec![unauthorized()]).await;
        h.session.get_token(false).await.unwrap();
        h.identity.fail_token_fetches(true);

        let error = h
            .client
            .post_json::<_, Value>("/workspaces/", &json!({"name": "Q3"}))
            .await
            .unwrap_err();

        assert_eq!(error.code(), "token_expired");
        assert_eq!(h.transport.requests().len(), 1);
        assert_eq!(h.identity.sign_outs(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_failure_is_swallowed() {
        let h = harness(signed_in(), vec![unauthorized(), unauthorized()]).await;
        h.identity.fail_sign_out(true);

        let error = h.client.get_json::<Value>("/x/", &[]).await.unwrap_err();
        assert_eq!(error.code(), "token_expired");
        assert_eq!(h.identity.sign_outs(), 1);
    }

    #[tokio::test]
    async fn test_network_failure() {
        let h = harness(
            signed_in(),
            vec![Err(TransportFailure::network("connection refused"))],
        )
        .await;

        let error = h.client.get_json::<Value>("/x/", &[]).await.unwrap_err();
        assert!(error.is_network());
        assert_eq!(h.identity.sign_outs(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_unknown() {
        let h = harness(
            FakeIdentityProvider::new(),
            vec![Ok(ApiResponse::new(200, b"not json".to_vec()))],
        )
        .await;

        let error = h.client.get_json::<Value>("/x/", &[]).await.unwrap_err();
        assert_eq!(error.code(), NormalizedError::UNKNOWN);
    }

    #[tokio::test]
    async fn test_query_and_body_forwarded() {
        let h = harness(FakeIdentityProvider::new(), vec![ok(&json!([])), ok(&json!({}))]).await;

        let _: Value = h
            .client
            .get_json("/artifacts/", &[("workspace".to_string(), "7".to_string())])
            .await
            .unwrap();
        let _: Value = h
            .client
            .patch_json("/artifacts/3/", &json!({"title": "Draft"}))
            .await
            .unwrap();

        let sent = h.transport.requests();
        assert_eq!(sent[0].query, vec![("workspace".to_string(), "7".to_string())]);
        assert_eq!(sent[1].body, Some(json!({"title": "Draft"})));
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_unit_or_option() {
        let h = harness(
            FakeIdentityProvider::new(),
            vec![Ok(ApiResponse::new(204, Vec::new()))],
        )
        .await;

        let body: Option<Value> = h
            .client
            .put_json("/artifacts/3/", &json!({"title": "Final"}))
            .await
            .unwrap();
        assert_eq!(body, None);
    }
}
