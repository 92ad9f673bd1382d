//! Authentication domain types

mod error;
mod types;

pub use error::AuthError;
pub use types::{CachedToken, Principal, Session, SessionStatus, TOKEN_TTL};
