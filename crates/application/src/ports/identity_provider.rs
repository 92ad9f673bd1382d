//! Identity provider port

use async_trait::async_trait;
use deadline_domain::{AuthError, Principal};
use thiserror::Error;
use tokio::sync::watch;

/// Why an access token could not be produced.
///
/// Never surfaced to API callers: the session provider collapses it to
/// "no token available".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenFetchError {
    /// The provider holds no credentials for the principal.
    #[error("no credentials held for principal {0}")]
    NotSignedIn(String),

    /// The provider refused to issue a token.
    #[error("token refresh rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("identity provider unreachable: {0}")]
    Network(String),
}

/// The external service that authenticates principals and issues tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in an existing principal.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` classified from the provider's error code.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    /// Creates a principal and signs it in.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` classified from the provider's error code.
    async fn register(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    /// Produces an access token for `principal`, refreshing it upstream
    /// when `force` is set or the provider's own copy is about to expire.
    ///
    /// # Errors
    ///
    /// Returns a `TokenFetchError` if no token can be produced.
    async fn current_token(
        &self,
        principal: &Principal,
        force: bool,
    ) -> Result<String, TokenFetchError>;

    /// Ends the provider-side session.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the provider could not sign out.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Auth-state notifications.
    ///
    /// The receiver's current value is the first notification; every
    /// sign-in, sign-up and sign-out publishes a new value.
    fn auth_state_changes(&self) -> watch::Receiver<Option<Principal>>;
}
