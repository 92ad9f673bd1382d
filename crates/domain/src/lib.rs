//! Deadline Domain - Core types
//!
//! This crate defines the domain model for the Deadline API client:
//! who is signed in, what token they hold, what goes over the wire
//! and what a failed call looks like to callers.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod failure;
pub mod request;
pub mod response;

pub use auth::{AuthError, CachedToken, Principal, Session, SessionStatus, TOKEN_TTL};
pub use error::{DomainError, DomainResult, NormalizedError};
pub use failure::{ErrorCode, ErrorPayload, TransportFailure};
pub use request::{ApiRequest, Header, HttpMethod};
pub use response::ApiResponse;
