//! Session management for the Deadline API client.
//!
//! This module provides:
//! - The process-wide session provider (who is signed in)
//! - The short-lived access-token cache it serves tokens from

mod provider;
mod token_cache;

pub use provider::SessionProvider;
pub use token_cache::{TokenCache, TokenStatus};
