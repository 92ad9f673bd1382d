//! Seams between the request client and the session provider.

use async_trait::async_trait;
use deadline_domain::AuthError;

use crate::session::SessionProvider;

/// Supplies bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a token, bypassing any cache when `force` is set.
    async fn token(&self, force: bool) -> Option<String>;
}

/// Ends the session once credentials are known to be unusable.
#[async_trait]
pub trait SignOutHook: Send + Sync {
    /// Signs out.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the identity provider rejects the sign-out.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

#[async_trait]
impl TokenSource for SessionProvider {
    async fn token(&self, force: bool) -> Option<String> {
        self.get_token(force).await
    }
}

#[async_trait]
impl SignOutHook for SessionProvider {
    async fn sign_out(&self) -> Result<(), AuthError> {
        SessionProvider::sign_out(self).await
    }
}
