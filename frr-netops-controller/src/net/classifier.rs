use std::net::Ipv4Addr;

use pnet::datalink::MacAddr;

use crate::net::inventory::InterfaceInfo;

/// Loopback, container, bridge and hypervisor interfaces never get a
/// gratuitous ARP.
pub const DEFAULT_EXCLUDE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "xfrm", "vme", "vsync",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Excluded,
    Down,
    NoLinkAddress,
    NoIpv4Address,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::Excluded => "not announceable",
            SkipReason::Down => "interface down",
            SkipReason::NoLinkAddress => "no link-layer address",
            SkipReason::NoIpv4Address => "no IPv4 address",
        };
        f.write_str(reason)
    }
}

/// Prefix based name filter. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    prefixes: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDE_PREFIXES.iter().map(ToString::to_string))
    }
}

impl Classifier {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    pub fn is_announceable(&self, name: &str) -> bool {
        !self.is_excluded(name)
    }

    /// Returns the addresses to announce with, or why the interface is left alone.
    pub fn classify(&self, info: &InterfaceInfo) -> Result<(MacAddr, Ipv4Addr), SkipReason> {
        if !self.is_announceable(&info.name) {
            return Err(SkipReason::Excluded);
        }
        if !info.is_up {
            return Err(SkipReason::Down);
        }
        let mac = info.mac_address.ok_or(SkipReason::NoLinkAddress)?;
        let ip = info.ipv4_address.ok_or(SkipReason::NoIpv4Address)?;
        Ok((mac, ip))
    }
}
