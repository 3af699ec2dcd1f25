//! Identity Commands

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use netbeacon_common::{AddressResolver, NetworkIdentity, PrivateAddress, ResolverConfig};

use crate::client::ApiClient;
use crate::output::{print_json, print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct IdentityArgs {
    /// Skip the cloud metadata endpoint
    #[arg(long)]
    pub no_metadata: bool,

    /// Only enumerate local interfaces; do not contact public IP services
    #[arg(long)]
    pub private_only: bool,
}

/// Private address display wrapper
#[derive(Serialize)]
pub struct AddressDisplay {
    pub interface: String,
    pub address: String,
}

impl From<&PrivateAddress> for AddressDisplay {
    fn from(addr: &PrivateAddress) -> Self {
        Self {
            interface: addr.interface_name.clone(),
            address: addr.address.to_string(),
        }
    }
}

impl TableDisplay for AddressDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Interface", "Address"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.interface.clone(), self.address.clone()]
    }
}

/// Resolve this machine's identity in-process
pub async fn execute_local(args: IdentityArgs, format: OutputFormat) -> Result<()> {
    let config = ResolverConfig {
        metadata_enabled: !args.no_metadata,
        ..Default::default()
    };
    let resolver = AddressResolver::from_config(&config)?;

    if args.private_only {
        let displays: Vec<AddressDisplay> = resolver
            .resolve_private_addresses()
            .iter()
            .map(AddressDisplay::from)
            .collect();
        print_list(&displays, format);
        return Ok(());
    }

    let identity = resolver.resolve_identity().await;
    print_identity(&identity, format);
    Ok(())
}

/// Fetch the identity a server reports for itself
pub async fn execute_remote(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let identity = client.ip_info().await?;
    print_identity(&identity, format);
    Ok(())
}

fn print_identity(identity: &NetworkIdentity, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(identity);
        return;
    }

    println!("Public IP: {}", identity.public_address);
    println!(
        "Observed:  {}",
        netbeacon_common::timestamp::format(&identity.observed_at)
    );
    let displays: Vec<AddressDisplay> = identity
        .private_addresses
        .iter()
        .map(AddressDisplay::from)
        .collect();
    print_list(&displays, format);
}
