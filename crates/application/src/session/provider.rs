//! The process-wide session provider.
//!
//! Single writer of the current [`Session`]. Auth-state notifications from
//! the identity provider are applied by a background task; everybody else
//! reads through [`SessionProvider::session`] or a [`SessionProvider::subscribe`]
//! receiver.

use std::sync::{Arc, Mutex};

use deadline_domain::{AuthError, CachedToken, Principal, Session};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{TokenCache, TokenStatus};
use crate::ports::{Clock, IdentityProvider};

/// Tracks who is signed in and hands out their access token.
pub struct SessionProvider {
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    session: Arc<watch::Sender<Session>>,
    cache: TokenCache,
    /// Serialises upstream token fetches so concurrent misses share one fetch.
    fetch_lock: AsyncMutex<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionProvider {
    /// Creates the provider and starts listening for auth-state changes.
    ///
    /// The session is `Loading` until the first notification is applied.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(identity: Arc<dyn IdentityProvider>, clock: Arc<dyn Clock>) -> Arc<Self> {
        let (session, _) = watch::channel(Session::loading());
        let provider = Arc::new(Self {
            identity,
            clock,
            session: Arc::new(session),
            cache: TokenCache::new(),
            fetch_lock: AsyncMutex::new(()),
            listener: Mutex::new(None),
        });

        let handle = tokio::spawn(Self::listen(
            provider.identity.auth_state_changes(),
            Arc::clone(&provider.session),
            provider.cache.clone(),
        ));
        if let Ok(mut listener) = provider.listener.lock() {
            *listener = Some(handle);
        }

        provider
    }

    async fn listen(
        mut changes: watch::Receiver<Option<Principal>>,
        session: Arc<watch::Sender<Session>>,
        cache: TokenCache,
    ) {
        loop {
            let principal = changes.borrow_and_update().clone();
            cache
                .retain_for(principal.as_ref().map(|p| p.uid.as_str()))
                .await;
            Self::publish(&session, Session::from_notification(principal));

            if changes.changed().await.is_err() {
                debug!("auth-state stream closed");
                break;
            }
        }
    }

    /// Replaces the session, notifying subscribers only on a real change.
    fn publish(session: &watch::Sender<Session>, next: Session) {
        session.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!(
                from = ?current.status(),
                to = ?next.status(),
                uid = next.principal().map(|p| p.uid.as_str()),
                "session changed"
            );
            *current = next;
            true
        });
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// The signed-in principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.session.borrow().principal().cloned()
    }

    /// Receiver that is notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Waits until the session has left `Loading` and returns it.
    pub async fn wait_until_resolved(&self) -> Session {
        let mut receiver = self.subscribe();
        let resolved = receiver
            .wait_for(|session| !session.is_loading())
            .await
            .map(|session| session.clone());
        resolved.unwrap_or_else(|_| self.session())
    }

    /// Signs in an existing principal.
    ///
    /// The session becomes `Authenticated` when the identity provider's
    /// notification arrives, not when this call returns.
    ///
    /// # Errors
    ///
    /// Returns the classified `AuthError` from the identity provider.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        match self.identity.authenticate(email, password).await {
            Ok(principal) => {
                info!(uid = %principal.uid, "signed in");
                Ok(principal)
            }
            Err(e) => {
                info!(code = e.code(), "sign-in rejected");
                Err(e)
            }
        }
    }

    /// Creates a principal and signs it in.
    ///
    /// # Errors
    ///
    /// Returns the classified `AuthError` from the identity provider.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        match self.identity.register(email, password).await {
            Ok(principal) => {
                info!(uid = %principal.uid, "signed up");
                Ok(principal)
            }
            Err(e) => {
                info!(code = e.code(), "sign-up rejected");
                Err(e)
            }
        }
    }

    /// Signs out, dropping the cached token and the session.
    ///
    /// Waits for a `Loading` session to resolve first, so a restored
    /// session is signed out too. A no-op when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the identity provider fails to sign out.
    /// The local session and token are cleared regardless.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.wait_until_resolved().await;
        let Some(principal) = session.principal() else {
            self.cache.clear().await;
            debug!("sign-out with no session");
            return Ok(());
        };

        // Anonymous goes out before the cache is cleared so an in-flight
        // fetch for this principal cannot write its token back.
        Self::publish(&self.session, Session::anonymous());
        self.cache.clear().await;
        info!(uid = %principal.uid, "signed out");
        self.identity.sign_out().await
    }

    /// Returns an access token for the signed-in principal.
    ///
    /// Serves the cached token while it is younger than the TTL unless
    /// `force` is set. Returns `None` when nobody is signed in or the
    /// token cannot be fetched; never fails.
    pub async fn get_token(&self, force: bool) -> Option<String> {
        let principal = self.principal()?;

        if !force && let Some(token) = self.cached(&principal).await {
            return Some(token);
        }

        let _guard = self.fetch_lock.lock().await;
        if !force && let Some(token) = self.cached(&principal).await {
            return Some(token);
        }

        let issued_at = self.clock.now();
        match self.identity.current_token(&principal, force).await {
            Ok(token) => {
                if self.principal().as_ref() == Some(&principal) {
                    self.cache
                        .replace(CachedToken::new(&token, &principal.uid, issued_at))
                        .await;
                }
                debug!(force, "fetched access token");
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, force, "token fetch failed");
                None
            }
        }
    }

    async fn cached(&self, principal: &Principal) -> Option<String> {
        let token = self.cache.fresh(&principal.uid, self.clock.now()).await;
        if token.is_some() {
            debug!("token cache hit");
        }
        token
    }

    /// Status of the cached token, for display.
    pub async fn token_status(&self) -> TokenStatus {
        self.cache.status(self.clock.now()).await
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock()
            && let Some(handle) = listener.take()
        {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("session", &*self.session.borrow())
            .finish_non_exhaustive()
    }
}
