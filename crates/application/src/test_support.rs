//! Test doubles shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::significant_drop_tightening)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use deadline_domain::{ApiRequest, ApiResponse, AuthError, Principal, TransportFailure};
use tokio::sync::watch;

use crate::ports::{Clock, IdentityProvider, TokenFetchError, Transport};

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(20_000)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("Lock poisoned");
        *now += TimeDelta::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("Lock poisoned")
    }
}

/// In-memory identity provider with a six-character password policy.
pub struct FakeIdentityProvider {
    state: watch::Sender<Option<Principal>>,
    accounts: Mutex<HashMap<String, (String, Principal)>>,
    token_fetches: AtomicUsize,
    forced_fetches: AtomicUsize,
    sign_outs: AtomicUsize,
    fail_tokens: AtomicBool,
    fail_sign_out: AtomicBool,
    token_delay: Duration,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self {
            state: watch::channel(None).0,
            accounts: Mutex::new(HashMap::new()),
            token_fetches: AtomicUsize::new(0),
            forced_fetches: AtomicUsize::new(0),
            sign_outs: AtomicUsize::new(0),
            fail_tokens: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            token_delay: Duration::ZERO,
        }
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        let principal = Principal::new(format!("uid-{email}")).with_email(email);
        self.accounts
            .lock()
            .expect("Lock poisoned")
            .insert(email.to_string(), (password.to_string(), principal));
        self
    }

    /// Starts with `email` already signed in, as a restored session would.
    pub fn signed_in(self, email: &str) -> Self {
        let principal = self
            .accounts
            .lock()
            .expect("Lock poisoned")
            .get(email)
            .map(|(_, p)| p.clone())
            .unwrap_or_else(|| Principal::new(format!("uid-{email}")).with_email(email));
        self.state.send_replace(Some(principal));
        self
    }

    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub fn token_fetches(&self) -> usize {
        self.token_fetches.load(Ordering::SeqCst)
    }

    pub fn forced_fetches(&self) -> usize {
        self.forced_fetches.load(Ordering::SeqCst)
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub fn fail_token_fetches(&self, fail: bool) {
        self.fail_tokens.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let principal = {
            let accounts = self.accounts.lock().expect("Lock poisoned");
            match accounts.get(email) {
                None => return Err(AuthError::from_upstream("auth/user-not-found", "")),
                Some((stored, _)) if stored != password => {
                    return Err(AuthError::from_upstream("auth/wrong-password", ""));
                }
                Some((_, principal)) => principal.clone(),
            }
        };
        self.state.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn register(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let principal = {
            let mut accounts = self.accounts.lock().expect("Lock poisoned");
            if accounts.contains_key(email) {
                return Err(AuthError::from_upstream("auth/email-already-in-use", ""));
            }
            if password.len() < 6 {
                return Err(AuthError::from_upstream("auth/weak-password", ""));
            }
            let principal = Principal::new(format!("uid-{email}")).with_email(email);
            accounts.insert(email.to_string(), (password.to_string(), principal.clone()));
            principal
        };
        self.state.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn current_token(
        &self,
        principal: &Principal,
        force: bool,
    ) -> Result<String, TokenFetchError> {
        if !self.token_delay.is_zero() {
            tokio::time::sleep(self.token_delay).await;
        }
        if self.fail_tokens.load(Ordering::SeqCst) {
            return Err(TokenFetchError::Network("identity provider down".to_string()));
        }
        if force {
            self.forced_fetches.fetch_add(1, Ordering::SeqCst);
        }
        let n = self.token_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-token-{n}", principal.uid))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::network("sign-out endpoint unreachable"));
        }
        self.state.send_replace(None);
        Ok(())
    }

    fn auth_state_changes(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}

/// Transport that replays scripted outcomes and records what it was sent.
///
/// Once the script runs out every request gets `200 {}`.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ApiResponse, TransportFailure>>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<ApiResponse, TransportFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::new(Vec::new())
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().expect("Lock poisoned").clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, TransportFailure> {
        self.seen.lock().expect("Lock poisoned").push(request.clone());
        self.script
            .lock()
            .expect("Lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::new(200, b"{}".to_vec())))
    }
}

pub fn unauthorized() -> Result<ApiResponse, TransportFailure> {
    Err(TransportFailure::rejected(
        401,
        br#"{"code": "token_expired", "message": "Token expired"}"#,
    ))
}
