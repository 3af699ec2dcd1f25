//! Resolver and peer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Port every instance listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 3000;

/// Public-address discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Query the cloud metadata endpoint before the echo services
    pub metadata_enabled: bool,

    /// Link-local metadata URL returning the public IPv4 as plain text
    pub metadata_url: String,

    pub metadata_timeout_ms: u64,

    /// "What is my IP" services, tried in order
    pub echo_services: Vec<EchoServiceConfig>,

    /// Per-service timeout
    pub echo_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            metadata_enabled: true,
            metadata_url: "http://169.254.169.254/latest/meta-data/public-ipv4".to_string(),
            metadata_timeout_ms: 1_000,
            echo_services: vec![
                EchoServiceConfig::new("ipify.org", "https://api.ipify.org?format=json"),
                EchoServiceConfig::new("ipapi.co", "https://ipapi.co/json/"),
                EchoServiceConfig::new("httpbin.org", "https://httpbin.org/ip"),
            ],
            echo_timeout_ms: 3_000,
        }
    }
}

impl ResolverConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }
}

/// A JSON "echo my IP" service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoServiceConfig {
    pub name: String,
    pub url: String,

    /// Response fields that may carry the address, first match wins
    #[serde(default = "default_ip_fields")]
    pub fields: Vec<String>,
}

impl EchoServiceConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            fields: default_ip_fields(),
        }
    }
}

fn default_ip_fields() -> Vec<String> {
    ["ip", "origin", "query"].iter().map(|f| f.to_string()).collect()
}

/// Outbound handshake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Port the peer's registration endpoint listens on
    pub port: u16,

    pub timeout_ms: u64,

    /// Note sent when the caller supplies none
    pub default_note: String,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout_ms: 5_000,
            default_note: "hello from peer".to_string(),
        }
    }
}

impl PeerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Registration endpoint of `peer_host` on the well-known port.
    pub fn register_url(&self, peer_host: &str) -> String {
        format!("http://{}:{}/api/peer/register", peer_host, self.port)
    }
}
