//! Error types shared by the interface inventory, the frame builder, the
//! link transmitter and the two maintenance collaborators.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The host interface list could not be read. Fatal to a run.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("interface query returned no interfaces, the kernel interface list is unavailable")]
    Empty,

    #[error("netlink interface query failed: {0}")]
    Netlink(String),
}

/// A textual address handed to the frame builder did not parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidAddressError {
    #[error("invalid MAC address {0:?}")]
    Mac(String),

    #[error("invalid IPv4 address {0:?}")]
    Ipv4(String),

    #[error("frame is {0} bytes, an Ethernet ARP frame is 42 bytes")]
    FrameLength(usize),
}

/// Sending one frame on one link failed.
#[derive(Debug, Error)]
pub enum TransmissionError {
    #[error("interface {0} not found")]
    InterfaceNotFound(String),

    #[error("failed to open link-layer socket on {interface}: {source}")]
    Open {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("link-layer channel on {0} is not an Ethernet channel")]
    UnsupportedChannel(String),

    #[error("failed to send frame on {interface}: {source}")]
    Send {
        interface: String,
        #[source]
        source: io::Error,
    },

    /// The channel gave no send result. pnet discards the byte count of
    /// `sendto`, so a partially accepted frame cannot be told apart from a
    /// sent one and never lands here.
    #[error("link-layer socket on {0} did not accept the frame")]
    NotAccepted(String),
}

/// Failures of the SNMP `agentaddress` rewrite. Each kind maps to its own
/// process exit code.
#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("failed to retrieve network interfaces: {0}")]
    Enumeration(#[from] EnumerationError),

    #[error("interface {name:?} not found, available interfaces: {}", .available.join(", "))]
    InterfaceNotFound { name: String, available: Vec<String> },

    #[error("no IPv4 address found on interface {0:?}")]
    NoIpv4Address(String),

    #[error("SNMPD configuration file {0:?} not found")]
    ConfigMissing(PathBuf),

    #[error("insufficient permissions to read/write {0:?}")]
    PermissionDenied(PathBuf),

    #[error("failed to update configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration was updated but permissions on {path:?} were not changed: {source}")]
    SetPermissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SnmpError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SnmpError::Enumeration(_) => 1,
            SnmpError::InterfaceNotFound { .. } => 2,
            SnmpError::NoIpv4Address(_) => 3,
            SnmpError::ConfigMissing(_) => 4,
            SnmpError::PermissionDenied(_) => 5,
            SnmpError::Io { .. } => 6,
            SnmpError::SetPermissions { .. } => 8,
        }
    }
}

/// Removing the addresses of one link failed.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("failed to list addresses of {interface}: {message}")]
    List { interface: String, message: String },

    #[error("failed to delete address from {interface}: {message}")]
    Delete { interface: String, message: String },
}
