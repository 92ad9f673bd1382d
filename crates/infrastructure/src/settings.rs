//! Environment configuration.
//!
//! Every setting comes from a `DEADLINE_*` environment variable. Required
//! variables that are missing stop a development build at startup; a
//! production build logs them and carries on with defaults.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::auth::IdentityToolkitSettings;

/// Prefix shared by every variable.
const PREFIX: &str = "DEADLINE";

/// Base URL used when `DEADLINE_API_BASE_URL` is absent in production.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Per-request timeout used when `DEADLINE_API_TIMEOUT_SECS` is absent.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Variables a deployment must set.
pub const REQUIRED_VARS: [&str; 5] = [
    "DEADLINE_API_BASE_URL",
    "DEADLINE_IDENTITY_API_KEY",
    "DEADLINE_IDENTITY_AUTH_DOMAIN",
    "DEADLINE_IDENTITY_PROJECT_ID",
    "DEADLINE_IDENTITY_APP_ID",
];

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variables are unset or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A variable is set but unusable.
    #[error("invalid value for {name}: {message}")]
    Invalid {
        /// Variable name.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// The environment could not be read.
    #[error(transparent)]
    Source(#[from] ::config::ConfigError),
}

/// Deployment flavour, from `DEADLINE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Missing configuration is fatal.
    #[default]
    Development,
    /// Missing configuration is logged and defaulted.
    Production,
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Raw `DEADLINE_*` variables, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvSettings {
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    identity_api_key: Option<String>,
    #[serde(default)]
    identity_auth_domain: Option<String>,
    #[serde(default)]
    identity_project_id: Option<String>,
    #[serde(default)]
    identity_app_id: Option<String>,
    #[serde(default)]
    identity_endpoint: Option<String>,
    #[serde(default)]
    token_endpoint: Option<String>,
    #[serde(default)]
    api_timeout_secs: Option<String>,
    #[serde(default)]
    env: Option<Deployment>,
}

impl EnvSettings {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Source` if a variable cannot be decoded.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Reads from an explicit variable map instead of the process
    /// environment. Keys are full variable names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Source` if a variable cannot be decoded.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_source(Some(vars))
    }

    fn from_source(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::Environment::with_prefix(PREFIX).source(vars))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        let value = match name {
            "DEADLINE_API_BASE_URL" => &self.api_base_url,
            "DEADLINE_IDENTITY_API_KEY" => &self.identity_api_key,
            "DEADLINE_IDENTITY_AUTH_DOMAIN" => &self.identity_auth_domain,
            "DEADLINE_IDENTITY_PROJECT_ID" => &self.identity_project_id,
            "DEADLINE_IDENTITY_APP_ID" => &self.identity_app_id,
            "DEADLINE_IDENTITY_ENDPOINT" => &self.identity_endpoint,
            "DEADLINE_TOKEN_ENDPOINT" => &self.token_endpoint,
            "DEADLINE_API_TIMEOUT_SECS" => &self.api_timeout_secs,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Deployment flavour; development unless `DEADLINE_ENV=production`.
    #[must_use]
    pub fn deployment(&self) -> Deployment {
        self.env.unwrap_or_default()
    }

    /// Required variables that are unset or blank.
    #[must_use]
    pub fn missing_vars(&self) -> Vec<&'static str> {
        REQUIRED_VARS
            .into_iter()
            .filter(|name| self.lookup(name).is_none())
            .collect()
    }

    /// Looks up a single variable, failing if it is unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the variable.
    pub fn require(&self, name: &str) -> Result<&str, ConfigError> {
        self.lookup(name)
            .ok_or_else(|| ConfigError::Missing(vec![name.to_string()]))
    }

    /// Validates the variables into an [`AppConfig`].
    ///
    /// # Errors
    ///
    /// In development, returns `ConfigError::Missing` listing every absent
    /// required variable. In any deployment, returns `ConfigError::Invalid`
    /// for a URL or timeout that does not parse.
    pub fn into_config(self) -> Result<AppConfig, ConfigError> {
        let deployment = self.deployment();
        let missing = self.missing_vars();
        if !missing.is_empty() {
            match deployment {
                Deployment::Development => {
                    return Err(ConfigError::Missing(
                        missing.into_iter().map(str::to_string).collect(),
                    ));
                }
                Deployment::Production => {
                    warn!(missing = ?missing, "required configuration missing, using defaults");
                }
            }
        }

        let api_base_url = parse_url(
            "DEADLINE_API_BASE_URL",
            self.lookup("DEADLINE_API_BASE_URL")
                .unwrap_or(DEFAULT_API_BASE_URL),
        )?;
        let identity = IdentityToolkitSettings {
            api_key: self
                .lookup("DEADLINE_IDENTITY_API_KEY")
                .unwrap_or_default()
                .to_string(),
            identity_endpoint: parse_url(
                "DEADLINE_IDENTITY_ENDPOINT",
                self.lookup("DEADLINE_IDENTITY_ENDPOINT")
                    .unwrap_or(IdentityToolkitSettings::DEFAULT_IDENTITY_ENDPOINT),
            )?,
            token_endpoint: parse_url(
                "DEADLINE_TOKEN_ENDPOINT",
                self.lookup("DEADLINE_TOKEN_ENDPOINT")
                    .unwrap_or(IdentityToolkitSettings::DEFAULT_TOKEN_ENDPOINT),
            )?,
        };
        let api_timeout = self
            .lookup("DEADLINE_API_TIMEOUT_SECS")
            .map_or(Ok(DEFAULT_API_TIMEOUT), |value| {
                parse_timeout("DEADLINE_API_TIMEOUT_SECS", value)
            })?;
        let owned = |name: &str| self.lookup(name).map(str::to_string);

        Ok(AppConfig {
            deployment,
            api_base_url,
            api_timeout,
            identity,
            auth_domain: owned("DEADLINE_IDENTITY_AUTH_DOMAIN"),
            project_id: owned("DEADLINE_IDENTITY_PROJECT_ID"),
            app_id: owned("DEADLINE_IDENTITY_APP_ID"),
        })
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn parse_timeout(name: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        Ok(_) => Err(ConfigError::Invalid {
            name: name.to_string(),
            message: "timeout must be at least one second".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            name: name.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Deployment flavour.
    pub deployment: Deployment,
    /// Root of the resource API.
    pub api_base_url: Url,
    /// Per-request timeout for the resource API.
    pub api_timeout: Duration,
    /// Identity provider connection.
    pub identity: IdentityToolkitSettings,
    /// Identity project's auth domain.
    pub auth_domain: Option<String>,
    /// Identity project id.
    pub project_id: Option<String>,
    /// Identity app id.
    pub app_id: Option<String>,
}

impl AppConfig {
    /// Loads and validates the process environment.
    ///
    /// # Errors
    ///
    /// See [`EnvSettings::into_config`].
    pub fn from_env() -> Result<Self, ConfigError> {
        EnvSettings::load()?.into_config()
    }
}
