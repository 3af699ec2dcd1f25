//! NetBeacon HTTP API client

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use netbeacon_common::api::{
    ErrorBody, HandshakePayload, ReceivedList, RegisterResponse, SendRequest, SendResponse,
};
use netbeacon_common::NetworkIdentity;

/// Client for a running NetBeacon server
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a new client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if the server is healthy
    pub async fn health_check(&self) -> bool {
        match self.http.get(self.url("/api/health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    pub async fn ip_info(&self) -> Result<NetworkIdentity> {
        let response = self.http.get(self.url("/api/ip-info")).send().await?;
        decode(response).await
    }

    pub async fn received(&self) -> Result<ReceivedList> {
        let response = self.http.get(self.url("/api/peer/received")).send().await?;
        decode(response).await
    }

    pub async fn register(&self, from_private_ip: Option<String>, note: Option<String>) -> Result<RegisterResponse> {
        let body = HandshakePayload { from_private_ip, note };
        self.post("/api/peer/register", &body).await
    }

    /// Ask the server to send its handshake to `peer_host`
    pub async fn send(&self, peer_host: &str, note: Option<String>) -> Result<SendResponse> {
        let body = SendRequest {
            peer_host: Some(peer_host.to_string()),
            note,
        };
        self.post("/api/peer/send", &body).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }
}

/// Decode a success body, or turn an `{ok:false,error}` body into an error.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => bail!("server returned {}: {}", status, body.error),
            Err(_) => bail!("server returned {}: {}", status, String::from_utf8_lossy(&bytes)),
        }
    }

    Ok(serde_json::from_slice(&bytes)?)
}
