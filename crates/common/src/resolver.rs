//! Address resolution
//!
//! Answers "who am I on the network": the public address through an
//! ordered chain of probes, and the private IPv4 addresses from the local
//! interface table. Both operations are total; failures degrade to the
//! `N/A` sentinel or an empty list.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::interfaces::{private_ipv4, InterfaceSource, SystemInterfaces};
use crate::probe::{probes_from_config, PublicIpProbe};
use crate::types::{NetworkIdentity, PrivateAddress, PublicAddress};
use crate::Result;

/// Resolves this host's network identity.
pub struct AddressResolver {
    client: reqwest::Client,
    probes: Vec<Box<dyn PublicIpProbe>>,
    interfaces: Box<dyn InterfaceSource>,
}

impl AddressResolver {
    /// Resolver with no probes, reading the live interface table.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            probes: Vec::new(),
            interfaces: Box::new(SystemInterfaces),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("netbeacon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(client).with_probes(probes_from_config(config)))
    }

    /// Append a probe to the end of the chain.
    pub fn with_probe(mut self, probe: impl PublicIpProbe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn with_probes(mut self, probes: Vec<Box<dyn PublicIpProbe>>) -> Self {
        self.probes.extend(probes);
        self
    }

    pub fn with_interfaces(mut self, interfaces: impl InterfaceSource + 'static) -> Self {
        self.interfaces = Box::new(interfaces);
        self
    }

    /// Names of the configured probes, in priority order.
    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// First address any probe reports, or [`PublicAddress::Unavailable`].
    pub async fn resolve_public_address(&self) -> PublicAddress {
        for probe in &self.probes {
            debug!(probe = probe.name(), "querying public address source");

            match tokio::time::timeout(probe.timeout(), probe.probe(&self.client)).await {
                Ok(Ok(ip)) => {
                    info!(probe = probe.name(), %ip, "public address resolved");
                    return PublicAddress::Known(ip);
                }
                Ok(Err(e)) => {
                    debug!(probe = probe.name(), error = %e, "public address source failed");
                }
                Err(_) => {
                    debug!(
                        probe = probe.name(),
                        timeout_ms = probe.timeout().as_millis() as u64,
                        "public address source timed out"
                    );
                }
            }
        }

        warn!("all public address sources failed");
        PublicAddress::Unavailable
    }

    /// Non-loopback IPv4 addresses in OS enumeration order.
    pub fn resolve_private_addresses(&self) -> Vec<PrivateAddress> {
        match self.interfaces.snapshot() {
            Ok(snapshot) => private_ipv4(snapshot),
            Err(e) => {
                warn!("failed to enumerate network interfaces: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn resolve_identity(&self) -> NetworkIdentity {
        let public_address = self.resolve_public_address().await;
        let private_addresses = self.resolve_private_addresses();

        NetworkIdentity {
            public_address,
            private_addresses,
            observed_at: Utc::now(),
        }
    }
}
