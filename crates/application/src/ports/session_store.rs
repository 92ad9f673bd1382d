//! Session store port
//!
//! Defines the interface for persisting a signed-in session between runs.

use async_trait::async_trait;
use deadline_domain::Principal;
use serde::{Deserialize, Serialize};

/// What is remembered about a signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// The principal that was signed in.
    pub principal: Principal,
    /// Long-lived credential used to mint new access tokens.
    pub refresh_token: String,
}

/// Errors that can occur during session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Repository trait for session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored session, if one exists.
    ///
    /// # Errors
    /// Returns an error if the store exists but cannot be read.
    async fn load(&self) -> Result<Option<StoredSession>, SessionStoreError>;

    /// Replaces the stored session.
    ///
    /// # Errors
    /// Returns an error if the session cannot be written.
    async fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError>;

    /// Removes the stored session. Clearing an empty store succeeds.
    ///
    /// # Errors
    /// Returns an error if the store cannot be removed.
    async fn clear(&self) -> Result<(), SessionStoreError>;
}
