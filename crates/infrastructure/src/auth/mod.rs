//! Identity provider adapters.

mod identity_toolkit;

pub use identity_toolkit::{IdentityToolkitProvider, IdentityToolkitSettings};
