//! NetBeacon CLI
//!
//! Command-line client for querying a NetBeacon server and driving peer
//! handshakes from a terminal.

pub mod client;
pub mod commands;
pub mod output;

pub use client::ApiClient;
