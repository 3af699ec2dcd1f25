//! Core types for NetBeacon

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Sentinel reported when no public-address source answered.
pub const PUBLIC_IP_UNAVAILABLE: &str = "N/A";

/// Externally visible address of this host, best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PublicAddress {
    Known(String),
    Unavailable,
}

impl PublicAddress {
    pub fn as_str(&self) -> &str {
        match self {
            PublicAddress::Known(ip) => ip,
            PublicAddress::Unavailable => PUBLIC_IP_UNAVAILABLE,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, PublicAddress::Known(_))
    }
}

impl fmt::Display for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PublicAddress {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == PUBLIC_IP_UNAVAILABLE {
            PublicAddress::Unavailable
        } else {
            PublicAddress::Known(trimmed.to_string())
        }
    }
}

impl From<PublicAddress> for String {
    fn from(value: PublicAddress) -> Self {
        match value {
            PublicAddress::Known(ip) => ip,
            PublicAddress::Unavailable => PUBLIC_IP_UNAVAILABLE.to_string(),
        }
    }
}

/// One IPv4 address bound to a non-loopback interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateAddress {
    #[serde(rename = "interface")]
    pub interface_name: String,
    pub address: Ipv4Addr,
}

/// Snapshot of how this host sees itself on the network.
///
/// Recomputed on every query and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIdentity {
    #[serde(rename = "publicIP")]
    pub public_address: PublicAddress,
    #[serde(rename = "privateIPs")]
    pub private_addresses: Vec<PrivateAddress>,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

/// A handshake received from another instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerHandshakeRecord {
    #[serde(rename = "fromPrivateIP")]
    pub from_private_ip: String,
    pub note: String,
    #[serde(rename = "receivedAt", with = "timestamp")]
    pub received_at: DateTime<Utc>,
    /// Source address of the inbound connection.
    #[serde(rename = "client")]
    pub client_address: Option<String>,
    /// Raw `X-Forwarded-For` header, if a proxy added one.
    #[serde(rename = "xff")]
    pub forwarded_for: Option<String>,
}

/// RFC 3339 UTC timestamps with millisecond precision, e.g.
/// `2025-03-01T09:30:00.123Z`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
