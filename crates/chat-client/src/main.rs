// crates/chat-client/src/main.rs

mod logs;
mod network;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::logs::ClientLogs;
use crate::network::{ChatConnection, SessionEnd};

const RULE: &str = "-- -- -- -- -- -- -- -- -- -- -- -- -- -- -- --";

#[derive(Parser)]
#[clap(name = "chat-client")]
#[clap(about = "Terminal client for the chatroom server")]
struct Cli {
    /// Server IP address
    server_ip: IpAddr,

    /// Server port
    #[clap(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// File that receives every line from the server
    #[clap(long, default_value = "client_global.log")]
    global_log: PathBuf,

    /// File that receives the echoes of your own messages
    #[clap(long, default_value = "client_personal.log")]
    personal_log: PathBuf,

    /// Enable debug logging on stderr
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.debug {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    let logs = ClientLogs::open(&cli.global_log, &cli.personal_log)
        .await
        .context("cannot open client logs")?;

    let server = SocketAddr::new(cli.server_ip, cli.port);
    let connection = ChatConnection::connect(server, logs).await?;

    println!("Connected to {}.", cli.server_ip);
    println!();
    println!("Press CTRL-C to exit.");
    println!("Type messages and press enter to send.");
    println!("{}", RULE);
    println!();

    let end = connection.run().await?;

    println!();
    println!("{}", RULE);
    println!();
    match end {
        SessionEnd::ServerClosed => println!("Connection with {} closed by server.", cli.server_ip),
        SessionEnd::SendFailed => println!("Connection with {} lost.", cli.server_ip),
        SessionEnd::InputClosed | SessionEnd::Interrupted => {
            println!("Connection with {} closed.", cli.server_ip)
        }
    }

    Ok(())
}
