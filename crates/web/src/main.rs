//! NetBeacon Web Service

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use netbeacon_web::{ServerConfig, WebServer};

#[derive(Parser)]
#[command(name = "netbeacon-web")]
#[command(about = "Reports this instance's network identity and exchanges peer handshakes")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NETBEACON_CONFIG", default_value = "netbeacon.toml")]
    config: PathBuf,

    /// HTTP listen address
    #[arg(short, long, env = "NETBEACON_LISTEN")]
    listen: Option<SocketAddr>,

    /// Port peers listen on for handshakes
    #[arg(long, env = "NETBEACON_PEER_PORT")]
    peer_port: Option<u16>,

    /// Directory of static pages served alongside the API
    #[arg(long, env = "NETBEACON_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Skip the cloud metadata endpoint when resolving the public address
    #[arg(long)]
    no_metadata: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "NETBEACON_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.log_json);

    let mut config = ServerConfig::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(port) = cli.peer_port {
        config.peer.port = port;
    }
    if cli.static_dir.is_some() {
        config.static_dir = cli.static_dir;
    }
    if cli.no_metadata {
        config.resolver.metadata_enabled = false;
    }

    info!("NetBeacon v{}", env!("CARGO_PKG_VERSION"));

    let server = WebServer::new(config)?;
    server.serve().await?;

    info!("Shutdown complete");
    Ok(())
}

fn init_logging(debug: bool, json: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
