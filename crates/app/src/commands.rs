//! Wiring and command execution.

use std::sync::Arc;

use deadline_application::ports::Clock;
use deadline_application::{ApiClient, SessionProvider};
use deadline_infrastructure::{
    AppConfig, FileSessionStore, IdentityToolkitProvider, ReqwestTransport, SystemClock,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::cli::Command;
use crate::error::CliError;

/// Everything a command needs.
struct Services {
    session: Arc<SessionProvider>,
    client: ApiClient,
}

async fn connect(config: AppConfig) -> Result<Services, CliError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let mut identity = IdentityToolkitProvider::new(config.identity, Arc::clone(&clock));
    if let Some(store) = FileSessionStore::in_config_dir() {
        debug!(path = %store.path().display(), "using session file");
        identity = identity.with_session_store(Arc::new(store));
    }
    identity.restore().await;

    let session = SessionProvider::start(Arc::new(identity), clock);
    session.wait_until_resolved().await;

    let transport = ReqwestTransport::new(config.api_base_url)
        .map_err(|e| CliError::Startup(e.to_string()))?
        .with_timeout(config.api_timeout);
    debug!(base_url = %transport.base_url(), timeout = ?config.api_timeout, "api transport ready");
    let client = ApiClient::authenticated(Arc::new(transport), Arc::clone(&session));

    Ok(Services { session, client })
}

/// Runs `command` and returns what to print.
pub async fn run(command: Command) -> Result<Value, CliError> {
    let config = AppConfig::from_env()?;
    info!(deployment = %config.deployment, api = %config.api_base_url, "starting");
    let services = connect(config).await?;
    execute(&services.session, &services.client, command).await
}

async fn execute(
    session: &SessionProvider,
    client: &ApiClient,
    command: Command,
) -> Result<Value, CliError> {
    match command {
        Command::SignIn { email, password } => {
            let principal = session.sign_in(&email, &password).await?;
            Ok(json!(principal))
        }
        Command::SignUp { email, password } => {
            let principal = session.sign_up(&email, &password).await?;
            Ok(json!(principal))
        }
        Command::SignOut => {
            session.sign_out().await?;
            Ok(json!({"signed_out": true}))
        }
        Command::Whoami => Ok(json!({
            "session": session.session(),
            "token": session.token_status().await.display_message(),
        })),
        Command::Get { path, query } => Ok(client.get_json(&path, &query).await?),
        Command::Post { path, data } => {
            let body: Value = serde_json::from_str(&data)?;
            Ok(client.post_json(&path, &body).await?)
        }
        Command::Put { path, data } => {
            let body: Value = serde_json::from_str(&data)?;
            Ok(client.put_json(&path, &body).await?)
        }
        Command::Patch { path, data } => {
            let body: Value = serde_json::from_str(&data)?;
            Ok(client.patch_json(&path, &body).await?)
        }
        Command::Delete { path } => {
            client.delete(&path).await?;
            Ok(json!({"deleted": path}))
        }
    }
}
