//! Deadline Application - Session and request pipeline
//!
//! This crate defines the application layer with:
//! - Port traits (clock, identity provider, transport, session store)
//! - The session provider and its access-token cache
//! - The authenticated request pipeline and the `ApiClient` built on it

pub mod client;
pub mod ports;
pub mod session;

#[cfg(test)]
mod test_support;

pub use client::{
    ApiClient, BearerTokenStage, DispatchOutcome, Pipeline, RefreshOnUnauthorized,
    RequestContext, RequestStage, ResponseAction, ResponseStage, SignOutHook, TokenSource,
};
pub use ports::{
    Clock, IdentityProvider, SessionStore, SessionStoreError, StoredSession, TokenFetchError,
    Transport,
};
pub use session::{SessionProvider, TokenCache, TokenStatus};
