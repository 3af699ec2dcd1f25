//! Local interface enumeration

use crate::types::PrivateAddress;
use std::net::IpAddr;

/// One address bound to one interface, as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub name: String,
    pub ip: IpAddr,
    pub loopback: bool,
}

impl InterfaceAddr {
    pub fn new(name: &str, ip: IpAddr, loopback: bool) -> Self {
        Self {
            name: name.to_string(),
            ip,
            loopback,
        }
    }
}

/// Source of interface snapshots.
pub trait InterfaceSource: Send + Sync {
    fn snapshot(&self) -> std::io::Result<Vec<InterfaceAddr>>;
}

/// Reads the live interface table via `getifaddrs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn snapshot(&self) -> std::io::Result<Vec<InterfaceAddr>> {
        let addrs = if_addrs::get_if_addrs()?
            .into_iter()
            .map(|iface| {
                let loopback = iface.is_loopback();
                let ip = iface.ip();
                InterfaceAddr {
                    name: iface.name,
                    ip,
                    loopback,
                }
            })
            .collect();
        Ok(addrs)
    }
}

/// A frozen interface table, for hosts pinned to known addresses and for tests.
#[derive(Debug, Default, Clone)]
pub struct FixedInterfaces(pub Vec<InterfaceAddr>);

impl InterfaceSource for FixedInterfaces {
    fn snapshot(&self) -> std::io::Result<Vec<InterfaceAddr>> {
        Ok(self.0.clone())
    }
}

/// Keep IPv4 addresses of non-loopback interfaces, preserving OS order.
pub fn private_ipv4(snapshot: Vec<InterfaceAddr>) -> Vec<PrivateAddress> {
    snapshot
        .into_iter()
        .filter(|iface| !iface.loopback)
        .filter_map(|iface| match iface.ip {
            IpAddr::V4(v4) if !v4.is_loopback() => Some(PrivateAddress {
                interface_name: iface.name,
                address: v4,
            }),
            _ => None,
        })
        .collect()
}
