mod config;
mod guard;
mod http;

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tinyauth_authz::{AuthClient, AuthzEngine};
use tinyauth_obs::{ObsConfig, init_tracing};
use tracing::warn;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "tinyauth-server", version, about = "Tinyauth-protected demo server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Validate configuration and print the derived resource namespace.
    CheckConfig,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    let config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, config).await,
        Command::CheckConfig => check_config(&config),
    }
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    if config.bypass {
        warn!("TINYAUTH_BYPASS is set; every authorization check will pass");
    }
    let client = AuthClient::new(config.client_config());
    let engine = Arc::new(AuthzEngine::new(
        config.identity.clone(),
        client,
        config.bypass,
    ));
    let state = AppState {
        engine,
        config: config.clone(),
    };
    http::serve(cmd.into(), state).await
}

fn check_config(config: &AppConfig) -> Result<()> {
    println!("{}", config.identity.base());
    Ok(())
}
