//! Session and token types

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// How long a fetched access token is served from cache.
pub const TOKEN_TTL: Duration = Duration::from_secs(60);

/// The authenticated identity record returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user id assigned by the identity provider.
    pub uid: String,
    /// Email the principal signed in with, if known.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name, if the provider has one.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Principal {
    /// Creates a principal with only a user id.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Where the session is in its lifecycle.
///
/// `Loading` is only ever seen before the first auth-state notification.
/// Consumers must not make redirect decisions while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for the identity provider's first notification.
    #[default]
    Loading,
    /// A principal is signed in.
    Authenticated,
    /// Nobody is signed in.
    Anonymous,
}

/// Snapshot of who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    principal: Option<Principal>,
    status: SessionStatus,
}

impl Session {
    /// The startup session, before anything is known.
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            principal: None,
            status: SessionStatus::Loading,
        }
    }

    /// A session with nobody signed in.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            principal: None,
            status: SessionStatus::Anonymous,
        }
    }

    /// A session for a signed-in principal.
    #[must_use]
    pub const fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            status: SessionStatus::Authenticated,
        }
    }

    /// Builds the session implied by an auth-state notification.
    #[must_use]
    pub fn from_notification(principal: Option<Principal>) -> Self {
        principal.map_or_else(Self::anonymous, Self::authenticated)
    }

    /// The signed-in principal, if any.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns true until the first notification has been applied.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.status, SessionStatus::Loading)
    }

    /// Returns true if a principal is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated)
    }
}

/// An access token remembered by the session provider.
///
/// Entries are replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// The bearer token.
    pub value: String,
    /// When the token was fetched.
    pub issued_at: DateTime<Utc>,
    /// Which principal the token belongs to.
    pub uid: String,
}

impl CachedToken {
    /// Creates a cache entry.
    #[must_use]
    pub fn new(value: impl Into<String>, uid: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            issued_at,
            uid: uid.into(),
        }
    }

    /// Age of the entry at `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.issued_at)
    }

    /// Returns true while the entry is younger than [`TOKEN_TTL`].
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        TimeDelta::from_std(TOKEN_TTL).is_ok_and(|ttl| self.age(now) < ttl)
    }

    /// Returns true if the entry is fresh and was issued for `uid`.
    #[must_use]
    pub fn serves(&self, uid: &str, now: DateTime<Utc>) -> bool {
        self.uid == uid && self.is_fresh(now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::milliseconds(ms)
    }

    #[test]
    fn test_session_starts_loading() {
        let session = Session::default();
        assert!(session.is_loading());
        assert!(session.principal().is_none());
        assert_eq!(session, Session::loading());
    }

    #[test]
    fn test_session_from_notification() {
        let signed_in = Session::from_notification(Some(Principal::new("u1")));
        assert!(signed_in.is_authenticated());
        assert_eq!(signed_in.principal().map(|p| p.uid.as_str()), Some("u1"));

        let signed_out = Session::from_notification(None);
        assert_eq!(signed_out.status(), SessionStatus::Anonymous);
        assert!(signed_out.principal().is_none());
    }

    #[test]
    fn test_cached_token_fresh_within_ttl() {
        let token = CachedToken::new("tok", "u1", at(0));
        assert!(token.is_fresh(at(0)));
        assert!(token.is_fresh(at(59_999)));
    }

    #[test]
    fn test_cached_token_stale_at_ttl() {
        let token = CachedToken::new("tok", "u1", at(0));
        assert!(!token.is_fresh(at(60_000)));
        assert!(!token.is_fresh(at(120_000)));
    }

    #[test]
    fn test_cached_token_other_principal() {
        let token = CachedToken::new("tok", "u1", at(0));
        assert!(token.serves("u1", at(10)));
        assert!(!token.serves("u2", at(10)));
    }

    #[test]
    fn test_principal_serde_defaults() {
        let principal: Principal = serde_json::from_str(r#"{"uid":"abc"}"#).unwrap();
        assert_eq!(principal, Principal::new("abc"));
    }
}
