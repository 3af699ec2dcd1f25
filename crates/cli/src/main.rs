//! NetBeacon CLI - Main Entry Point

use clap::{Parser, Subcommand};
use std::time::Duration;

use netbeacon_cli::commands::{identity, peer};
use netbeacon_cli::output::{self, OutputFormat};
use netbeacon_cli::ApiClient;

/// NetBeacon CLI - network identity and peer handshakes
#[derive(Parser)]
#[command(name = "netbeacon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Server address
    #[arg(long, env = "NETBEACON_SERVER", default_value = "http://127.0.0.1:3000", global = true)]
    server: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "15", global = true)]
    timeout: u64,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve this machine's identity without a server
    Identity(identity::IdentityArgs),

    /// Show the identity a server reports
    IpInfo,

    /// Peer handshakes
    #[command(flatten)]
    Peer(peer::PeerCommands),

    /// Check server status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let client = ApiClient::new(&cli.server, Duration::from_secs(cli.timeout))?;

    let result = match cli.command {
        Commands::Identity(args) => identity::execute_local(args, cli.format).await,
        Commands::IpInfo => identity::execute_remote(&client, cli.format).await,
        Commands::Peer(cmd) => peer::execute(cmd, &client, cli.format).await,
        Commands::Status => {
            if client.health_check().await {
                output::print_success(&format!("Server is running at {}", client.base_url()));
                Ok(())
            } else {
                output::print_error(&format!("Server is not responding at {}", client.base_url()));
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
