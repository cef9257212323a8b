//! TCP chatroom server.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chat_server::config::Config;
use chat_server::server;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "chat-server")]
#[clap(about = "Multi-client TCP chatroom server")]
struct Cli {
    /// TCP port to listen on
    #[clap(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Maximum number of simultaneously connected clients
    connection_limit: Option<usize>,

    /// Address to bind to
    #[clap(short, long)]
    bind: Option<String>,

    /// Transcript file every broadcast line is appended to
    #[clap(short, long)]
    log_file: Option<PathBuf>,

    /// Slots in the message queue
    #[clap(long)]
    queue_capacity: Option<usize>,

    /// TOML config file, applied before environment and CLI overrides
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Do not greet new connections with their client id
    #[clap(long)]
    no_welcome: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env()?;

        config.port = self.port;
        if let Some(limit) = self.connection_limit {
            config.max_clients = limit;
        }
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(path) = self.log_file {
            config.log_path = path;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if self.no_welcome {
            config.welcome = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = cli.into_config().context("invalid configuration")?;

    info!(
        "Starting chat-server on {} (connection limit = {}, queue = {}, log = {})",
        config.socket_addr_string(),
        config.max_clients,
        config.queue_capacity,
        config.log_path.display()
    );
    info!("Press Ctrl-C to exit");

    server::run(config).await?;
    Ok(())
}
