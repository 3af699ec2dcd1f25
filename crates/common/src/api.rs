//! HTTP API payloads shared by the server and the command-line client

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::peers::{Registration, SendReceipt};
use crate::types::PeerHandshakeRecord;

/// Body of `POST /api/peer/register`, and the wire contract between peers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandshakePayload {
    #[serde(rename = "fromPrivateIP", default, skip_serializing_if = "Option::is_none")]
    pub from_private_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Body of `POST /api/peer/send`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendRequest {
    #[serde(rename = "peerHost", default, skip_serializing_if = "Option::is_none")]
    pub peer_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// `GET /api/peer/received`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedList {
    pub count: usize,
    pub items: Vec<PeerHandshakeRecord>,
}

impl From<Vec<PeerHandshakeRecord>> for ReceivedList {
    fn from(items: Vec<PeerHandshakeRecord>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// `POST /api/peer/register` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub ok: bool,
    pub received: PeerHandshakeRecord,
    pub total: usize,
}

impl From<Registration> for RegisterResponse {
    fn from(registration: Registration) -> Self {
        Self {
            ok: true,
            received: registration.record,
            total: registration.total,
        }
    }
}

/// `POST /api/peer/send` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub ok: bool,
    #[serde(rename = "sentTo")]
    pub sent_to: String,
    #[serde(rename = "myPrivateIP")]
    pub my_private_ip: String,
    #[serde(rename = "peerResponse")]
    pub peer_response: Value,
}

impl From<SendReceipt> for SendResponse {
    fn from(receipt: SendReceipt) -> Self {
        Self {
            ok: true,
            sent_to: receipt.sent_to,
            my_private_ip: receipt.my_private_ip,
            peer_response: receipt.peer_response,
        }
    }
}

/// `{ok:false, error}` body for failed operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl ToString) -> Self {
        Self {
            ok: false,
            error: error.to_string(),
        }
    }
}
