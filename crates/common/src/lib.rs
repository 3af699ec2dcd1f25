//! NetBeacon Common Library
//!
//! Network self-identification and the peer handshake log shared by the
//! NetBeacon server and command-line client.

pub mod api;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod peers;
pub mod probe;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use config::{EchoServiceConfig, PeerConfig, ResolverConfig, DEFAULT_PORT};
pub use error::{Error, Result};
pub use interfaces::{FixedInterfaces, InterfaceAddr, InterfaceSource, SystemInterfaces};
pub use peers::{InboundHandshake, PeerExchange, PeerLog, Registration, SendReceipt};
pub use probe::{JsonEchoProbe, MetadataProbe, PublicIpProbe};
pub use resolver::AddressResolver;
pub use types::*;

/// NetBeacon version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
