use std::net::Ipv4Addr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)] // To prevent typos.
pub struct RawConfig {
    /// Interface name prefixes that never get a gratuitous ARP.
    pub exclude_prefixes: Option<Vec<String>>,

    pub snmpd_conf: Option<PathBuf>,
    pub snmp_port: Option<u16>,
    pub snmp_loopback: Option<Ipv4Addr>,

    /// Interface name prefixes treated as virtual by `flush`.
    pub flush_virtual_prefixes: Option<Vec<String>>,
    /// Interface names whose addresses `flush` keeps.
    pub flush_exclude: Option<Vec<String>>,
}
