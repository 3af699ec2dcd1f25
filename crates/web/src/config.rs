//! Server configuration

use netbeacon_common::{PeerConfig, ResolverConfig, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen address
    pub listen: SocketAddr,

    /// Directory served for paths the API does not claim
    pub static_dir: Option<PathBuf>,

    /// Maximum accepted request body, in bytes
    pub body_limit_bytes: usize,

    /// Public/private address discovery
    pub resolver: ResolverConfig,

    /// Outbound handshakes
    pub peer: PeerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            static_dir: None,
            body_limit_bytes: 100 * 1024,
            resolver: ResolverConfig::default(),
            peer: PeerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file, or defaults if it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}
