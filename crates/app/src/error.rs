//! Errors reported by the binary.

use deadline_domain::{AuthError, NormalizedError};
use deadline_infrastructure::ConfigError;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] NormalizedError),

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid query parameter `{0}`; expected name=value")]
    InvalidQuery(String),

    #[error("could not start HTTP client: {0}")]
    Startup(String),
}

impl CliError {
    /// JSON shape printed on stderr.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Api(error) => json!(error),
            Self::Auth(error) => json!({
                "code": error.code(),
                "message": error.user_message(),
            }),
            Self::Config(_) => json!({"code": "CONFIG_ERROR", "message": self.to_string()}),
            Self::InvalidJson(_) | Self::InvalidQuery(_) => {
                json!({"code": "INVALID_INPUT", "message": self.to_string()})
            }
            Self::Startup(_) => json!({"code": "STARTUP_ERROR", "message": self.to_string()}),
        }
    }
}
