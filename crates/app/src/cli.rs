//! Command-line interface definition.

use clap::{Parser, Subcommand};

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "deadline",
    version,
    about = "Client for the Deadline workspaces and artifacts API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Sign in with email and password.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DEADLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DEADLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session.
    SignOut,
    /// Show the current session.
    Whoami,
    /// GET a path under the API base URL.
    Get {
        path: String,
        /// Query parameter as `name=value`; repeatable.
        #[arg(long = "query", short = 'q', value_parser = parse_query_pair)]
        query: Vec<(String, String)>,
    },
    /// POST a JSON body.
    Post {
        path: String,
        #[arg(long)]
        data: String,
    },
    /// PUT a JSON body.
    Put {
        path: String,
        #[arg(long)]
        data: String,
    },
    /// PATCH with a JSON body.
    Patch {
        path: String,
        #[arg(long)]
        data: String,
    },
    /// DELETE a path.
    Delete { path: String },
}

fn parse_query_pair(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(CliError::InvalidQuery(raw.to_string())),
    }
}
