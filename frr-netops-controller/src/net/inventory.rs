use std::collections::HashMap;
use std::convert::TryFrom;
use std::net::Ipv4Addr;

use futures::TryStreamExt;
use pnet::datalink::{MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use rtnetlink::new_connection;
use rtnetlink::packet::address::nlas::Nla;
use rtnetlink::packet::AddressMessage;

use crate::error::EnumerationError;

/// Snapshot of one host interface, taken fresh on every enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac_address: Option<MacAddr>,
    pub ipv4_address: Option<Ipv4Addr>,
    pub broadcast_address: Option<Ipv4Addr>,
    pub is_up: bool,
}

pub trait Inventory {
    fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, EnumerationError>;
}

/// Broadcast addresses configured in the kernel (`IFA_BROADCAST`), keyed by
/// link index and local address. An address added without `brd` has none.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Broadcasts(HashMap<(u32, Ipv4Addr), Ipv4Addr>);

impl Broadcasts {
    pub fn insert(&mut self, index: u32, local: Ipv4Addr, broadcast: Ipv4Addr) {
        self.0.insert((index, local), broadcast);
    }

    pub fn get(&self, index: u32, local: Ipv4Addr) -> Option<Ipv4Addr> {
        self.0.get(&(index, local)).copied()
    }

    /// Dumps every address of the host over rtnetlink. Must be called from
    /// within a tokio runtime, the connection task is spawned on it.
    pub async fn from_kernel() -> Result<Self, EnumerationError> {
        let (connection, handle, _) =
            new_connection().map_err(|e| EnumerationError::Netlink(e.to_string()))?;
        tokio::spawn(connection);
        let mut stream = handle.address().get().execute();
        let mut broadcasts = Self::default();
        while let Some(msg) = stream
            .try_next()
            .await
            .map_err(|e| EnumerationError::Netlink(e.to_string()))?
        {
            broadcasts.record(&msg);
        }
        Ok(broadcasts)
    }

    /// Records the broadcast of one IPv4 address message, if it carries one.
    pub fn record(&mut self, msg: &AddressMessage) {
        let mut local = None;
        let mut address = None;
        let mut broadcast = None;
        for nla in &msg.nlas {
            match nla {
                Nla::Local(bytes) => local = to_ipv4(bytes),
                Nla::Address(bytes) => address = to_ipv4(bytes),
                Nla::Broadcast(bytes) => broadcast = to_ipv4(bytes),
                _ => {}
            }
        }
        // IFA_LOCAL is the interface's own address, IFA_ADDRESS the peer on
        // point-to-point links.
        if let (Some(local), Some(broadcast)) = (local.or(address), broadcast) {
            self.insert(msg.header.index, local, broadcast);
        }
    }
}

fn to_ipv4(bytes: &[u8]) -> Option<Ipv4Addr> {
    <[u8; 4]>::try_from(bytes).ok().map(Ipv4Addr::from)
}

/// Reads the interface list of the running host. The broadcast of each
/// interface comes from `broadcasts`, an empty table reports none.
#[derive(Debug, Default, Clone)]
pub struct HostInventory {
    broadcasts: Broadcasts,
}

impl HostInventory {
    pub fn new(broadcasts: Broadcasts) -> Self {
        Self { broadcasts }
    }
}

impl Inventory for HostInventory {
    fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, EnumerationError> {
        let interfaces = pnet::datalink::interfaces();
        // getifaddrs failures surface as an empty list, a host always has lo.
        if interfaces.is_empty() {
            return Err(EnumerationError::Empty);
        }
        Ok(interfaces
            .iter()
            .map(|device| interface_info(device, &self.broadcasts))
            .collect())
    }
}

pub fn interface_info(device: &NetworkInterface, broadcasts: &Broadcasts) -> InterfaceInfo {
    let ipv4_address = get_ipv4(device).map(|net| net.ip());
    InterfaceInfo {
        name: device.name.clone(),
        mac_address: device.mac.filter(|mac| *mac != MacAddr::zero()),
        ipv4_address,
        broadcast_address: ipv4_address.and_then(|ip| broadcasts.get(device.index, ip)),
        is_up: device.is_up(),
    }
}

pub fn get_ipv4(device: &NetworkInterface) -> Option<Ipv4Network> {
    device.ips.iter().find_map(|ip| match ip {
        IpNetwork::V4(ipv4) => Some(*ipv4),
        IpNetwork::V6(_) => None,
    })
}

pub fn find_interface<'a>(interfaces: &'a [InterfaceInfo], name: &str) -> Option<&'a InterfaceInfo> {
    interfaces.iter().find(|i| i.name == name)
}
