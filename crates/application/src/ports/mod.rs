//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod identity_provider;
mod session_store;
mod transport;

pub use clock::Clock;
pub use identity_provider::{IdentityProvider, TokenFetchError};
pub use session_store::{SessionStore, SessionStoreError, StoredSession};
pub use transport::Transport;
