//! Peer Commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use netbeacon_common::PeerHandshakeRecord;

use crate::client::ApiClient;
use crate::output::{print_item, print_json, print_list, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum PeerCommands {
    /// List handshakes the server has received
    Received,

    /// Register a handshake with the server directly
    Register {
        /// Address to announce (server records "unknown" if omitted)
        #[arg(long = "from")]
        from_private_ip: Option<String>,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Make the server announce itself to another instance
    Send {
        /// Peer host or IP
        #[arg(long)]
        peer_host: String,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },
}

/// Handshake record display wrapper
#[derive(Serialize)]
pub struct RecordDisplay {
    pub from: String,
    pub note: String,
    pub received_at: String,
    pub client: String,
    pub forwarded_for: String,
}

impl From<&PeerHandshakeRecord> for RecordDisplay {
    fn from(record: &PeerHandshakeRecord) -> Self {
        Self {
            from: record.from_private_ip.clone(),
            note: record.note.clone(),
            received_at: netbeacon_common::timestamp::format(&record.received_at),
            client: record.client_address.clone().unwrap_or_else(|| "-".to_string()),
            forwarded_for: record.forwarded_for.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

impl TableDisplay for RecordDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["From", "Note", "Received", "Client", "X-Forwarded-For"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.from.clone(),
            self.note.clone(),
            self.received_at.clone(),
            self.client.clone(),
            self.forwarded_for.clone(),
        ]
    }
}

pub async fn execute(cmd: PeerCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        PeerCommands::Received => {
            let list = client.received().await?;
            if let OutputFormat::Json = format {
                print_json(&list);
                return Ok(());
            }
            println!("{} handshake(s) received", list.count);
            let displays: Vec<RecordDisplay> = list.items.iter().map(RecordDisplay::from).collect();
            print_list(&displays, format);
        }

        PeerCommands::Register { from_private_ip, note } => {
            let response = client.register(from_private_ip, note).await?;
            if let OutputFormat::Json = format {
                print_json(&response);
                return Ok(());
            }
            print_success(&format!("Registered (total {})", response.total));
            print_item(&RecordDisplay::from(&response.received), format);
        }

        PeerCommands::Send { peer_host, note } => {
            let response = client.send(&peer_host, note).await?;
            if let OutputFormat::Json = format {
                print_json(&response);
                return Ok(());
            }
            print_success(&format!(
                "Sent {} to {}",
                response.my_private_ip, response.sent_to
            ));
            println!(
                "Peer response: {}",
                serde_json::to_string(&response.peer_response).unwrap_or_default()
            );
        }
    }

    Ok(())
}
