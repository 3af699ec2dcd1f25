//! NetBeacon Web Service
//!
//! HTTP API through which instances report their network identity and
//! exchange peer handshakes.

pub mod access_log;
pub mod config;
pub mod server;

pub use config::ServerConfig;
pub use server::{AppState, WebServer};
