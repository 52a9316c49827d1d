use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::Ipv4Addr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::SnmpError;
use crate::net::inventory::{find_interface, Inventory};

pub const DEFAULT_SNMPD_CONF: &str = "/etc/snmp/snmpd.conf";
pub const DEFAULT_SNMP_PORT: u16 = 161;
pub const DEFAULT_LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

const AGENT_ADDRESS: &str = "agentaddress";
const SNMPD_CONF_MODE: u32 = 0o640;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpConfig {
    pub path: PathBuf,
    pub port: u16,
    pub loopback: Ipv4Addr,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SNMPD_CONF),
            port: DEFAULT_SNMP_PORT,
            loopback: DEFAULT_LOOPBACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub interface: String,
    pub address: Ipv4Addr,
    pub directive: String,
    /// Number of `agentaddress` lines rewritten.
    pub replaced: usize,
}

pub fn agent_address_directive(config: &SnmpConfig, address: Ipv4Addr) -> String {
    format!(
        "{} udp:{}:{},udp:{}:{}",
        AGENT_ADDRESS, config.loopback, config.port, address, config.port
    )
}

/// Replaces every line starting with `agentaddress` by `directive`. Other
/// lines, including their line endings, are kept as they are.
pub fn rewrite_agent_address(contents: &str, directive: &str) -> (String, usize) {
    let mut replaced = 0;
    let mut out = String::with_capacity(contents.len() + directive.len());
    for line in contents.split_inclusive('\n') {
        if line.starts_with(AGENT_ADDRESS) {
            out.push_str(directive);
            out.push('\n');
            replaced += 1;
        } else {
            out.push_str(line);
        }
    }
    (out, replaced)
}

/// Points the SNMP daemon at the IPv4 address currently held by `interface`.
pub fn patch_agent_address<I: Inventory>(
    inventory: &I,
    interface: &str,
    config: &SnmpConfig,
) -> Result<PatchReport, SnmpError> {
    let interface = interface.trim();
    let interfaces = inventory.list_interfaces()?;
    let info = find_interface(&interfaces, interface).ok_or_else(|| SnmpError::InterfaceNotFound {
        name: interface.to_string(),
        available: interfaces.iter().map(|i| i.name.clone()).collect(),
    })?;
    let address = info
        .ipv4_address
        .ok_or_else(|| SnmpError::NoIpv4Address(interface.to_string()))?;
    tracing::info!("found IPv4 address {} on interface {}", address, interface);

    let directive = agent_address_directive(config, address);
    let replaced = rewrite_file(&config.path, &directive)?;
    if replaced == 0 {
        tracing::warn!("no {} line in {:?}, file left unchanged", AGENT_ADDRESS, config.path);
    } else {
        tracing::info!("updated {} in {:?}", AGENT_ADDRESS, config.path);
    }

    fs::set_permissions(&config.path, Permissions::from_mode(SNMPD_CONF_MODE)).map_err(|source| {
        SnmpError::SetPermissions {
            path: config.path.clone(),
            source,
        }
    })?;
    tracing::info!("set permissions on {:?} to {:o}", config.path, SNMPD_CONF_MODE);

    Ok(PatchReport {
        interface: interface.to_string(),
        address,
        directive,
        replaced,
    })
}

fn rewrite_file(path: &Path, directive: &str) -> Result<usize, SnmpError> {
    let io_err = |source: io::Error| SnmpError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SnmpError::ConfigMissing(path.to_path_buf()))
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(SnmpError::PermissionDenied(path.to_path_buf()))
        }
        Err(e) => return Err(io_err(e)),
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(io_err)?;
    let (rewritten, replaced) = rewrite_agent_address(&contents, directive);

    // Rewritten in place so the inode, owner and group stay the same.
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    file.write_all(rewritten.as_bytes()).map_err(io_err)?;
    file.set_len(rewritten.len() as u64).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(replaced)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pnet::datalink::MacAddr;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    use super::*;
    use crate::error::EnumerationError;
    use crate::net::inventory::InterfaceInfo;

    struct StaticInventory(Vec<InterfaceInfo>);

    impl Inventory for StaticInventory {
        fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, EnumerationError> {
            Ok(self.0.clone())
        }
    }

    fn inventory() -> StaticInventory {
        StaticInventory(vec![
            InterfaceInfo {
                name: "lo".to_string(),
                mac_address: None,
                ipv4_address: Some(Ipv4Addr::LOCALHOST),
                broadcast_address: None,
                is_up: true,
            },
            InterfaceInfo {
                name: "eth0".to_string(),
                mac_address: Some(MacAddr(2, 0, 0, 0, 0, 1)),
                ipv4_address: Some(Ipv4Addr::new(10, 20, 30, 40)),
                broadcast_address: Some(Ipv4Addr::new(10, 20, 30, 255)),
                is_up: true,
            },
            InterfaceInfo {
                name: "eth1".to_string(),
                mac_address: Some(MacAddr(2, 0, 0, 0, 0, 2)),
                ipv4_address: None,
                broadcast_address: None,
                is_up: true,
            },
        ])
    }

    fn config_file(contents: &str) -> (NamedTempFile, SnmpConfig) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let config = SnmpConfig {
            path: file.path().to_path_buf(),
            ..SnmpConfig::default()
        };
        (file, config)
    }

    #[test]
    fn test_rewrite_agent_address() {
        let contents = "# comment\nagentaddress udp:127.0.0.1:161\nrocommunity public\n  agentaddress kept\nlast line";
        let (out, replaced) = rewrite_agent_address(contents, "agentaddress udp:1.2.3.4:161");
        assert_eq!(replaced, 1);
        assert_eq!(
            out,
            "# comment\nagentaddress udp:1.2.3.4:161\nrocommunity public\n  agentaddress kept\nlast line"
        );
    }

    #[test]
    fn test_rewrite_keeps_crlf_and_last_line() {
        let (out, replaced) = rewrite_agent_address("sysName x\r\nagentaddress old", "agentaddress new");
        assert_eq!(replaced, 1);
        assert_eq!(out, "sysName x\r\nagentaddress new\n");
    }

    #[test]
    fn test_directive() {
        let config = SnmpConfig {
            port: 1161,
            ..SnmpConfig::default()
        };
        assert_eq!(
            agent_address_directive(&config, Ipv4Addr::new(10, 0, 0, 5)),
            "agentaddress udp:127.0.0.1:1161,udp:10.0.0.5:1161"
        );
    }

    #[test]
    fn test_patch_agent_address() {
        let (file, config) = config_file("sysLocation lab\nagentaddress udp:127.0.0.1:161\n");
        let report = patch_agent_address(&inventory(), " eth0 ", &config).unwrap();
        assert_eq!(report.interface, "eth0");
        assert_eq!(report.address, Ipv4Addr::new(10, 20, 30, 40));
        assert_eq!(report.replaced, 1);
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "sysLocation lab\nagentaddress udp:127.0.0.1:161,udp:10.20.30.40:161\n"
        );
        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_shorter_rewrite_truncates() {
        let long = format!("agentaddress {}\n", "x".repeat(200));
        let (file, config) = config_file(&long);
        patch_agent_address(&inventory(), "eth0", &config).unwrap();
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "agentaddress udp:127.0.0.1:161,udp:10.20.30.40:161\n"
        );
    }

    #[test]
    fn test_interface_errors() {
        let (_file, config) = config_file("agentaddress udp:127.0.0.1:161\n");
        match patch_agent_address(&inventory(), "eth9", &config) {
            Err(e @ SnmpError::InterfaceNotFound { .. }) => {
                assert_eq!(e.exit_code(), 2);
                assert!(e.to_string().contains("lo, eth0, eth1"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let err = patch_agent_address(&inventory(), "eth1", &config).unwrap_err();
        assert!(matches!(err, SnmpError::NoIpv4Address(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnmpConfig {
            path: dir.path().join("snmpd.conf"),
            ..SnmpConfig::default()
        };
        let err = patch_agent_address(&inventory(), "eth0", &config).unwrap_err();
        assert!(matches!(err, SnmpError::ConfigMissing(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_enumeration_error() {
        struct Broken;
        impl Inventory for Broken {
            fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, EnumerationError> {
                Err(EnumerationError::Empty)
            }
        }
        let err = patch_agent_address(&Broken, "eth0", &SnmpConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_config_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnmpConfig {
            path: dir.path().to_path_buf(),
            ..SnmpConfig::default()
        };
        let err = patch_agent_address(&inventory(), "eth0", &config).unwrap_err();
        assert!(matches!(err, SnmpError::Io { ref path, .. } if path == dir.path()));
        assert_eq!(err.exit_code(), 6);
    }

    fn io_error() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "disk full")
    }

    #[test_case(SnmpError::Enumeration(EnumerationError::Empty) => 1)]
    #[test_case(SnmpError::InterfaceNotFound { name: "eth9".to_string(), available: vec![] } => 2)]
    #[test_case(SnmpError::NoIpv4Address("eth1".to_string()) => 3)]
    #[test_case(SnmpError::ConfigMissing(PathBuf::from(DEFAULT_SNMPD_CONF)) => 4)]
    #[test_case(SnmpError::PermissionDenied(PathBuf::from(DEFAULT_SNMPD_CONF)) => 5)]
    #[test_case(SnmpError::Io { path: PathBuf::from(DEFAULT_SNMPD_CONF), source: io_error() } => 6)]
    #[test_case(SnmpError::SetPermissions { path: PathBuf::from(DEFAULT_SNMPD_CONF), source: io_error() } => 8)]
    fn test_exit_codes(err: SnmpError) -> i32 {
        err.exit_code()
    }
}
