//! Peer handshake exchange
//!
//! Keeps the process-lifetime log of handshakes other instances sent us and
//! sends our own handshake to a named peer.

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::HandshakePayload;
use crate::config::PeerConfig;
use crate::error::{error_chain, Error, Result};
use crate::resolver::AddressResolver;
use crate::types::PeerHandshakeRecord;

/// `fromPrivateIP` stored when the sender did not supply one.
pub const UNKNOWN_SENDER: &str = "unknown";

/// An inbound handshake before the server stamps it.
#[derive(Debug, Clone, Default)]
pub struct InboundHandshake {
    pub from_private_ip: Option<String>,
    pub note: Option<String>,
    pub client_address: Option<String>,
    pub forwarded_for: Option<String>,
}

/// Result of a registration: the stored record and the new log length.
#[derive(Debug, Clone)]
pub struct Registration {
    pub record: PeerHandshakeRecord,
    pub total: usize,
}

/// Result of a successful outbound handshake.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub sent_to: String,
    pub my_private_ip: String,
    /// Peer's JSON reply, or `{}` if it was not JSON.
    pub peer_response: Value,
}

/// Append-only handshake log.
#[derive(Debug, Default)]
pub struct PeerLog {
    records: RwLock<Vec<PeerHandshakeRecord>>,
}

impl PeerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handshake. Never fails; duplicates are kept.
    pub fn register(&self, inbound: InboundHandshake) -> Registration {
        let mut records = self.records.write();

        // Wall clock may step backwards; keep receivedAt non-decreasing.
        let now = Utc::now();
        let received_at = records
            .last()
            .map_or(now, |last| last.received_at.max(now));

        let record = PeerHandshakeRecord {
            from_private_ip: non_empty(inbound.from_private_ip)
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            note: inbound.note.unwrap_or_default(),
            received_at,
            client_address: inbound.client_address,
            forwarded_for: inbound.forwarded_for,
        };
        records.push(record.clone());

        Registration {
            record,
            total: records.len(),
        }
    }

    /// All records, oldest first.
    pub fn list(&self) -> Vec<PeerHandshakeRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handshake log plus the outbound side of the exchange.
pub struct PeerExchange {
    log: PeerLog,
    resolver: Arc<AddressResolver>,
    client: reqwest::Client,
    config: PeerConfig,
}

impl PeerExchange {
    pub fn new(resolver: Arc<AddressResolver>, config: PeerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("netbeacon/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            log: PeerLog::new(),
            resolver,
            client,
            config,
        })
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    pub fn register(&self, inbound: InboundHandshake) -> Registration {
        let registration = self.log.register(inbound);
        info!(
            from = %registration.record.from_private_ip,
            client = registration.record.client_address.as_deref().unwrap_or("-"),
            total = registration.total,
            "peer handshake received"
        );
        registration
    }

    pub fn list_received(&self) -> Vec<PeerHandshakeRecord> {
        self.log.list()
    }

    /// Announce our first private address to `peer_host`.
    ///
    /// Delivery is attempted once; a network failure is reported as
    /// [`Error::PeerUnreachable`] and left to the caller to retry.
    ///
    /// `peer_host` is trimmed first, so a whitespace-only host is rejected
    /// as missing rather than attempted.
    pub async fn send_to(&self, peer_host: Option<&str>, note: Option<&str>) -> Result<SendReceipt> {
        let peer_host = peer_host
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::InvalidArgument("peerHost is required".to_string()))?;

        // With several interfaces up, enumeration order decides which one we announce.
        let mine = self
            .resolver
            .resolve_private_addresses()
            .into_iter()
            .next()
            .ok_or(Error::NoLocalAddress)?;
        let my_private_ip = mine.address.to_string();

        let url = self.config.register_url(peer_host);
        let payload = HandshakePayload {
            from_private_ip: Some(my_private_ip.clone()),
            note: Some(
                note.filter(|n| !n.is_empty())
                    .unwrap_or(self.config.default_note.as_str())
                    .to_string(),
            ),
        };

        debug!(%url, interface = %mine.interface_name, "sending handshake");

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let reason = error_chain(&e);
                warn!(%url, error = %reason, "peer unreachable");
                Error::PeerUnreachable(reason)
            })?;

        let status = response.status();
        let peer_response = match response.json::<Value>().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%url, %status, "peer reply was not JSON: {}", e);
                Value::Object(Default::default())
            }
        };

        info!(%url, %status, "handshake delivered");

        Ok(SendReceipt {
            sent_to: url,
            my_private_ip,
            peer_response,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{FixedInterfaces, InterfaceAddr, InterfaceSource};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct CountingInterfaces {
        calls: Arc<AtomicUsize>,
    }

    impl InterfaceSource for CountingInterfaces {
        fn snapshot(&self) -> std::io::Result<Vec<InterfaceAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![InterfaceAddr::new(
                "eth0",
                IpAddr::V4(Ipv4Addr::new(10, 0, 1, 12)),
                false,
            )])
        }
    }

    fn exchange_with(interfaces: impl InterfaceSource + 'static, config: PeerConfig) -> PeerExchange {
        let resolver = AddressResolver::new(reqwest::Client::new()).with_interfaces(interfaces);
        PeerExchange::new(Arc::new(resolver), config).unwrap()
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_register_applies_defaults() {
        let log = PeerLog::new();
        let registration = log.register(InboundHandshake::default());

        assert_eq!(registration.record.from_private_ip, "unknown");
        assert_eq!(registration.record.note, "");
        assert_eq!(registration.record.client_address, None);
        assert_eq!(registration.record.forwarded_for, None);
        assert_eq!(registration.total, 1);
    }

    #[test]
    fn test_register_empty_sender_is_unknown() {
        let log = PeerLog::new();
        let registration = log.register(InboundHandshake {
            from_private_ip: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(registration.record.from_private_ip, "unknown");
    }

    #[test]
    fn test_register_preserves_order_and_count() {
        let log = PeerLog::new();
        let senders = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.2"];

        for (i, sender) in senders.iter().enumerate() {
            let registration = log.register(InboundHandshake {
                from_private_ip: Some(sender.to_string()),
                note: Some(format!("#{}", i)),
                client_address: Some("127.0.0.1".into()),
                forwarded_for: Some("203.0.113.9".into()),
            });
            assert_eq!(registration.total, i + 1);
        }

        let items = log.list();
        assert_eq!(items.len(), senders.len());
        for (item, sender) in items.iter().zip(senders.iter()) {
            assert_eq!(&item.from_private_ip, sender);
        }
        for pair in items.windows(2) {
            assert!(pair[0].received_at <= pair[1].received_at);
        }
        assert_eq!(items[0].forwarded_for.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_concurrent_registrations() {
        let log = Arc::new(PeerLog::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.register(InboundHandshake {
                            from_private_ip: Some(format!("10.0.{}.{}", t, i)),
                            ..Default::default()
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let items = log.list();
        assert_eq!(items.len(), 400);
        for pair in items.windows(2) {
            assert!(pair[0].received_at <= pair[1].received_at);
        }
    }

    #[tokio::test]
    async fn test_send_requires_peer_host() {
        let calls = Arc::new(AtomicUsize::new(0));
        let exchange = exchange_with(
            CountingInterfaces { calls: calls.clone() },
            PeerConfig::default(),
        );

        for host in [None, Some(""), Some("   ")] {
            let err = exchange.send_to(host, Some("x")).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(ref msg) if msg == "peerHost is required"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_without_local_address() {
        let exchange = exchange_with(
            FixedInterfaces(vec![InterfaceAddr::new(
                "lo",
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                true,
            )]),
            PeerConfig::default(),
        );

        let err = exchange.send_to(Some("10.0.0.9"), None).await.unwrap_err();
        assert!(matches!(err, Error::NoLocalAddress));
    }

    #[tokio::test]
    async fn test_send_to_closed_port_is_unreachable() {
        let config = PeerConfig {
            port: closed_port(),
            timeout_ms: 2_000,
            ..Default::default()
        };
        let exchange = exchange_with(
            CountingInterfaces { calls: Arc::default() },
            config,
        );

        let started = Instant::now();
        let err = exchange.send_to(Some("127.0.0.1"), Some("x")).await.unwrap_err();

        assert!(matches!(err, Error::PeerUnreachable(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(exchange.list_received().is_empty());
    }

    #[tokio::test]
    async fn test_send_to_silent_peer_times_out() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _guard = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = PeerConfig {
            port,
            timeout_ms: 300,
            ..Default::default()
        };
        let exchange = exchange_with(
            CountingInterfaces { calls: Arc::default() },
            config,
        );

        let started = Instant::now();
        let err = exchange.send_to(Some("127.0.0.1"), None).await.unwrap_err();

        assert!(matches!(err, Error::PeerUnreachable(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
