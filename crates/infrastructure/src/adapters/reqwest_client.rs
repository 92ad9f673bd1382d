//! Transport implementation using reqwest.
//!
//! Resolves request paths against the API base URL, sends JSON bodies and
//! decodes every failure into a `TransportFailure` before returning.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadline_application::ports::Transport;
use deadline_domain::{ApiRequest, ApiResponse, HttpMethod, TransportFailure};
use reqwest::{Client, Method};
use url::Url;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("deadline/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Creates a transport with a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Appends `request.path` to the base URL path and adds the query.
    ///
    /// `Url::join` would drop the base path for absolute paths, so the
    /// segments are concatenated instead.
    fn resolve(&self, request: &ApiRequest) -> Result<Url, TransportFailure> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = request.path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))
            .map_err(|e| TransportFailure::unexpected(format!("invalid URL for {path}: {e}")))?;

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    /// Maps errors raised before a response arrived.
    ///
    /// Anything that means no response arrived is `Network`.
    fn map_error(error: &reqwest::Error) -> TransportFailure {
        if error.is_builder() {
            return TransportFailure::unexpected(error.to_string());
        }
        if error.is_timeout() || error.is_connect() || error.is_request() {
            return TransportFailure::network(error.to_string());
        }
        TransportFailure::unexpected(error.to_string())
    }

    /// Maps a failed body read; the status line already arrived.
    fn map_body_error(status: u16, error: &reqwest::Error) -> TransportFailure {
        if (200..300).contains(&status) {
            TransportFailure::unexpected(format!("failed to read response body: {error}"))
        } else {
            TransportFailure::rejected(status, &[])
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, TransportFailure> {
        let url = self.resolve(request)?;
        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(self.timeout)
            .header("Accept", "application/json");

        for header in &request.headers {
            builder = builder.header(&header.name, &header.value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| Self::map_error(&e))?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_body_error(status, &e))?
            .to_vec();

        if !(200..300).contains(&status) {
            return Err(TransportFailure::rejected(status, &body));
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
            duration: start.elapsed(),
        })
    }
}
