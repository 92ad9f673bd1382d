//! Deadline Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus environment configuration.

pub mod adapters;
pub mod auth;
pub mod settings;
pub mod persistence;

pub use adapters::{ReqwestTransport, SystemClock};
pub use auth::{IdentityToolkitProvider, IdentityToolkitSettings};
pub use settings::{AppConfig, ConfigError, Deployment, EnvSettings};
pub use persistence::FileSessionStore;
