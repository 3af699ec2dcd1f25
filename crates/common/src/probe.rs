//! Public-address probes
//!
//! Each probe asks one external source for this host's public IP. Probes
//! report failure as [`Error::SourceUnavailable`]; the resolver decides
//! what to do with it.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{EchoServiceConfig, ResolverConfig};
use crate::error::{error_chain, Error, Result};

/// A single source of the public address.
#[async_trait]
pub trait PublicIpProbe: Send + Sync {
    /// Name used in log events.
    fn name(&self) -> &str;

    /// Upper bound on one attempt.
    fn timeout(&self) -> Duration;

    /// Returns a non-empty, trimmed address or `SourceUnavailable`.
    async fn probe(&self, client: &reqwest::Client) -> Result<String>;
}

/// Cloud metadata endpoint returning the address as plain text.
#[derive(Debug, Clone)]
pub struct MetadataProbe {
    url: String,
    timeout: Duration,
}

impl MetadataProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PublicIpProbe for MetadataProbe {
    fn name(&self) -> &str {
        "metadata"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn probe(&self, client: &reqwest::Client) -> Result<String> {
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::source_unavailable(self.name(), error_chain(&e)))?;

        if !response.status().is_success() {
            return Err(Error::source_unavailable(
                self.name(),
                format!("status {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::source_unavailable(self.name(), error_chain(&e)))?;

        match body.trim() {
            "" => Err(Error::source_unavailable(self.name(), "empty body")),
            ip => Ok(ip.to_string()),
        }
    }
}

/// JSON "echo my IP" service.
#[derive(Debug, Clone)]
pub struct JsonEchoProbe {
    name: String,
    url: String,
    fields: Vec<String>,
    timeout: Duration,
}

impl JsonEchoProbe {
    pub fn new(service: &EchoServiceConfig, timeout: Duration) -> Self {
        Self {
            name: service.name.clone(),
            url: service.url.clone(),
            fields: service.fields.clone(),
            timeout,
        }
    }
}

#[async_trait]
impl PublicIpProbe for JsonEchoProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn probe(&self, client: &reqwest::Client) -> Result<String> {
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::source_unavailable(&self.name, error_chain(&e)))?;

        if !response.status().is_success() {
            return Err(Error::source_unavailable(
                &self.name,
                format!("status {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::source_unavailable(&self.name, error_chain(&e)))?;

        extract_ip(&body, &self.fields)
            .ok_or_else(|| Error::source_unavailable(&self.name, "no address field in response"))
    }
}

/// First of `fields` holding a non-empty string, trimmed.
pub fn extract_ip<S: AsRef<str>>(body: &Value, fields: &[S]) -> Option<String> {
    fields.iter().find_map(|field| {
        body.get(field.as_ref())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
    })
}

/// Build the probe chain described by `config`, metadata first.
pub fn probes_from_config(config: &ResolverConfig) -> Vec<Box<dyn PublicIpProbe>> {
    let mut probes: Vec<Box<dyn PublicIpProbe>> = Vec::new();
    if config.metadata_enabled {
        probes.push(Box::new(MetadataProbe::new(
            config.metadata_url.clone(),
            config.metadata_timeout(),
        )));
    }
    for service in &config.echo_services {
        probes.push(Box::new(JsonEchoProbe::new(service, config.echo_timeout())));
    }
    probes
}
