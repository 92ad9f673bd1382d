//! Per-request state carried through the pipeline.

use uuid::Uuid;

/// State of one logical request across its dispatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Identifier used in tracing spans.
    pub id: Uuid,
    /// Set once the single retry has been used.
    pub retried: bool,
    /// Number of times the request has been put on the wire.
    pub dispatches: u32,
}

impl RequestContext {
    /// Creates a context for a new logical request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            retried: false,
            dispatches: 0,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
