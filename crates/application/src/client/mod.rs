//! Authenticated request client.
//!
//! Requests flow through a [`Pipeline`]: request stages decorate the
//! outbound request, the transport dispatches it, and response stages
//! decide whether the outcome is final or the request is sent once more.

mod api_client;
mod context;
mod credentials;
mod pipeline;
mod stage;
mod stages;

pub use api_client::ApiClient;
pub use context::RequestContext;
pub use credentials::{SignOutHook, TokenSource};
pub use pipeline::Pipeline;
pub use stage::{DispatchOutcome, RequestStage, ResponseAction, ResponseStage};
pub use stages::{BearerTokenStage, RefreshOnUnauthorized};
