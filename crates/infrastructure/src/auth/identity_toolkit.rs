//! Identity-toolkit REST provider.
//!
//! Signs principals in with email and password, mints ID tokens from a
//! refresh token, and broadcasts auth-state changes. With a session store
//! attached, the refresh token survives restarts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use deadline_application::ports::{
    Clock, IdentityProvider, SessionStore, StoredSession, TokenFetchError,
};
use deadline_domain::{AuthError, ErrorPayload, Principal};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};
use url::Url;

/// Content-Type for form-urlencoded data.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Tokens this close to expiry are refreshed before being handed out.
const REFRESH_WINDOW: TimeDelta = TimeDelta::minutes(5);

/// Lifetime assumed when the provider omits `expiresIn`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Where and how to reach the identity toolkit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToolkitSettings {
    /// Web API key sent as the `key` query parameter.
    pub api_key: String,
    /// Base of the `accounts:*` endpoints.
    pub identity_endpoint: Url,
    /// Base of the token refresh endpoint.
    pub token_endpoint: Url,
}

impl IdentityToolkitSettings {
    /// Public identity-toolkit base.
    pub const DEFAULT_IDENTITY_ENDPOINT: &'static str = "https://identitytoolkit.googleapis.com/v1";
    /// Public secure-token base.
    pub const DEFAULT_TOKEN_ENDPOINT: &'static str = "https://securetoken.googleapis.com/v1";

    fn accounts_url(&self, action: &str) -> Url {
        self.endpoint(&self.identity_endpoint, &format!("accounts:{action}"))
    }

    fn token_url(&self) -> Url {
        self.endpoint(&self.token_endpoint, "token")
    }

    fn endpoint(&self, base: &Url, segment: &str) -> Url {
        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url.query_pairs_mut().append_pair("key", &self.api_key);
        url
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// Response of `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

/// Response of the secure-token refresh endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

/// Tokens held for the signed-in principal.
#[derive(Debug, Clone)]
struct Credentials {
    principal: Principal,
    id_token: Option<String>,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Credentials {
    fn usable_token(&self, now: DateTime<Utc>) -> Option<&str> {
        self.id_token
            .as_deref()
            .filter(|_| now + REFRESH_WINDOW < self.expires_at)
    }
}

fn expiry(now: DateTime<Utc>, expires_in: Option<&str>) -> DateTime<Utc> {
    let secs = expires_in
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIFETIME_SECS);
    now + TimeDelta::seconds(secs)
}

/// Pulls the error code out of an identity-toolkit error body.
///
/// The toolkit reports its code in `error.message`, sometimes with a
/// trailing description after ` : `.
fn upstream_code(body: &[u8]) -> Option<String> {
    let payload = ErrorPayload::decode(body)?;
    payload.message.or_else(|| payload.code.map(|c| c.to_string()))
}

/// Identity provider backed by the identity-toolkit REST API.
pub struct IdentityToolkitProvider {
    settings: IdentityToolkitSettings,
    http_client: reqwest::Client,
    clock: Arc<dyn Clock>,
    credentials: RwLock<Option<Credentials>>,
    state: watch::Sender<Option<Principal>>,
    store: Option<Arc<dyn SessionStore>>,
}

impl IdentityToolkitProvider {
    /// Creates a provider with nobody signed in.
    #[must_use]
    pub fn new(settings: IdentityToolkitSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            http_client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            clock,
            credentials: RwLock::new(None),
            state: watch::channel(None).0,
            store: None,
        }
    }

    /// Persists sessions through `store`.
    #[must_use]
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Restores the persisted session, if any.
    ///
    /// The restored principal becomes the current auth state; its first
    /// token is minted from the stored refresh token on demand. A store
    /// that cannot be read is logged and treated as empty.
    pub async fn restore(&self) -> Option<Principal> {
        let store = self.store.as_ref()?;
        let stored = match store.load().await {
            Ok(stored) => stored?,
            Err(e) => {
                warn!(error = %e, "could not read stored session");
                return None;
            }
        };

        info!(uid = %stored.principal.uid, "restored session");
        *self.credentials.write().await = Some(Credentials {
            principal: stored.principal.clone(),
            id_token: None,
            refresh_token: stored.refresh_token,
            expires_at: self.clock.now(),
        });
        self.state.send_replace(Some(stored.principal.clone()));
        Some(stored.principal)
    }

    async fn password_flow(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self
            .http_client
            .post(self.settings.accounts_url(action))
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AuthError::network(e.to_string()))?;
        if !status.is_success() {
            let code = upstream_code(&bytes).unwrap_or_else(|| status.as_u16().to_string());
            return Err(AuthError::from_upstream(&code, code.clone()));
        }

        let account: AccountResponse = serde_json::from_slice(&bytes).map_err(|e| {
            AuthError::Unknown {
                code: "INVALID_RESPONSE".to_string(),
                message: e.to_string(),
            }
        })?;

        let principal = Principal {
            uid: account.local_id,
            email: account.email.or_else(|| Some(email.to_string())),
            display_name: account.display_name.filter(|n| !n.is_empty()),
        };
        let credentials = Credentials {
            principal: principal.clone(),
            id_token: Some(account.id_token),
            expires_at: expiry(self.clock.now(), account.expires_in.as_deref()),
            refresh_token: account.refresh_token,
        };

        self.persist(&credentials).await;
        *self.credentials.write().await = Some(credentials);
        self.state.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, TokenFetchError> {
        let form = serde_urlencoded::to_string([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .map_err(|e| TokenFetchError::Rejected(format!("failed to encode form: {e}")))?;

        let response = self
            .http_client
            .post(self.settings.token_url())
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(form)
            .send()
            .await
            .map_err(|e| TokenFetchError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TokenFetchError::Network(e.to_string()))?;
        if !status.is_success() {
            let code = upstream_code(&bytes).unwrap_or_else(|| status.as_u16().to_string());
            return Err(TokenFetchError::Rejected(code));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| TokenFetchError::Rejected(format!("invalid refresh response: {e}")))
    }

    async fn persist(&self, credentials: &Credentials) {
        let Some(store) = &self.store else {
            return;
        };
        let stored = StoredSession {
            principal: credentials.principal.clone(),
            refresh_token: credentials.refresh_token.clone(),
        };
        if let Err(e) = store.save(&stored).await {
            warn!(error = %e, "could not persist session");
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.password_flow("signInWithPassword", email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.password_flow("signUp", email, password).await
    }

    async fn current_token(
        &self,
        principal: &Principal,
        force: bool,
    ) -> Result<String, TokenFetchError> {
        let now = self.clock.now();
        let refresh_token = {
            let credentials = self.credentials.read().await;
            let held = credentials
                .as_ref()
                .filter(|c| c.principal.uid == principal.uid)
                .ok_or_else(|| TokenFetchError::NotSignedIn(principal.uid.clone()))?;
            if !force && let Some(token) = held.usable_token(now) {
                return Ok(token.to_string());
            }
            held.refresh_token.clone()
        };

        debug!(force, "refreshing id token");
        let refreshed = self.refresh(&refresh_token).await?;

        let mut credentials = self.credentials.write().await;
        let held = credentials
            .as_mut()
            .filter(|c| c.principal.uid == principal.uid)
            .ok_or_else(|| TokenFetchError::NotSignedIn(principal.uid.clone()))?;
        let rotated = held.refresh_token != refreshed.refresh_token;
        held.id_token = Some(refreshed.id_token.clone());
        held.refresh_token = refreshed.refresh_token;
        held.expires_at = expiry(self.clock.now(), refreshed.expires_in.as_deref());
        let snapshot = held.clone();
        drop(credentials);

        if rotated {
            self.persist(&snapshot).await;
        }
        Ok(refreshed.id_token)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.credentials.write().await.take();
        self.state.send_replace(None);

        if let Some(store) = &self.store {
            store.clear().await.map_err(|e| AuthError::Unknown {
                code: "SESSION_STORE".to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn auth_state_changes(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}
