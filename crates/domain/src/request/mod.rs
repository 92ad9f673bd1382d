//! Outbound request types

mod api_request;
mod method;

pub use api_request::{ApiRequest, Header};
pub use method::HttpMethod;
