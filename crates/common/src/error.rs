//! Error types for NetBeacon

use thiserror::Error;

/// Result type alias using NetBeacon Error
pub type Result<T> = std::result::Result<T, Error>;

/// NetBeacon error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required request field was missing or empty.
    #[error("{0}")]
    InvalidArgument(String),

    /// The host has no non-loopback IPv4 address to announce.
    #[error("no private IPv4 address found on this host")]
    NoLocalAddress,

    /// Outbound delivery to a peer failed at the network layer.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    /// A single public-address source failed. Never leaves the resolver.
    #[error("{probe} unavailable: {reason}")]
    SourceUnavailable { probe: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn source_unavailable(probe: &str, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            probe: probe.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Render an error together with its `source()` chain.
///
/// reqwest hides the interesting part ("connection refused", "dns error")
/// behind a generic "error sending request" message.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        current = cause.source();
    }
    out
}
