//! In-memory access-token cache with TTL tracking.
//!
//! Holds at most one entry, for the signed-in principal. Writers always
//! replace the whole entry, so readers see either the old token or the
//! new one.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use deadline_domain::{CachedToken, TOKEN_TTL};
use tokio::sync::RwLock;

/// Thread-safe single-entry token cache.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    entry: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token for `uid` if it is still fresh at `now`.
    pub async fn fresh(&self, uid: &str, now: DateTime<Utc>) -> Option<String> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|token| token.serves(uid, now))
            .map(|token| token.value.clone())
    }

    /// Replaces the entry.
    pub async fn replace(&self, token: CachedToken) {
        *self.entry.write().await = Some(token);
    }

    /// Drops the entry.
    pub async fn clear(&self) {
        *self.entry.write().await = None;
    }

    /// Drops the entry unless it belongs to `uid`.
    pub async fn retain_for(&self, uid: Option<&str>) {
        let mut entry = self.entry.write().await;
        if entry.as_ref().is_some_and(|token| Some(token.uid.as_str()) != uid) {
            *entry = None;
        }
    }

    /// Get token status for display.
    pub async fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        let entry = self.entry.read().await;
        entry.as_ref().map_or(TokenStatus::Empty, |token| {
            if token.is_fresh(now) {
                let ttl = TimeDelta::from_std(TOKEN_TTL).unwrap_or_else(|_| TimeDelta::zero());
                TokenStatus::Fresh {
                    seconds_remaining: (ttl - token.age(now)).num_seconds(),
                }
            } else {
                TokenStatus::Stale
            }
        })
    }
}

/// Status of the cached token for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Nothing cached; the next read goes upstream.
    Empty,
    /// Served from cache for a while longer.
    Fresh {
        /// Seconds until the entry goes stale.
        seconds_remaining: i64,
    },
    /// Cached but too old; the next read goes upstream.
    Stale,
}

impl TokenStatus {
    /// Returns true if the next non-forced read will be a cache hit.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Empty => "No cached token".to_string(),
            Self::Fresh { seconds_remaining } => {
                format!("Cached token, fresh for {seconds_remaining} seconds")
            }
            Self::Stale => "Cached token is stale".to_string(),
        }
    }
}
