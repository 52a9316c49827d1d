use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::path::PathBuf;

use anyhow::{anyhow, Error};

use crate::net::classifier::{Classifier, DEFAULT_EXCLUDE_PREFIXES};
use crate::net::flush::{FlushPolicy, DEFAULT_VIRTUAL_PREFIXES};
use crate::net::snmp::{SnmpConfig, DEFAULT_LOOPBACK, DEFAULT_SNMPD_CONF, DEFAULT_SNMP_PORT};
use crate::raw_config::RawConfig;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub classifier: Classifier,
    pub snmp: SnmpConfig,
    pub flush: FlushPolicy,
}

impl TryFrom<RawConfig> for Config {
    type Error = Error;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let exclude_prefixes = prefixes("exclude_prefixes", raw.exclude_prefixes, DEFAULT_EXCLUDE_PREFIXES)?;
        let virtual_prefixes = prefixes(
            "flush_virtual_prefixes",
            raw.flush_virtual_prefixes,
            DEFAULT_VIRTUAL_PREFIXES,
        )?;
        Ok(Config {
            classifier: Classifier::new(exclude_prefixes),
            snmp: SnmpConfig {
                path: raw.snmpd_conf.unwrap_or_else(|| PathBuf::from(DEFAULT_SNMPD_CONF)),
                port: match raw.snmp_port {
                    Some(0) => return Err(anyhow!("snmp_port must not be 0")),
                    Some(port) => port,
                    None => DEFAULT_SNMP_PORT,
                },
                loopback: raw.snmp_loopback.unwrap_or(DEFAULT_LOOPBACK),
            },
            flush: FlushPolicy {
                virtual_prefixes: Classifier::new(virtual_prefixes),
                excluded: raw
                    .flush_exclude
                    .unwrap_or_default()
                    .into_iter()
                    .collect::<BTreeSet<_>>(),
            },
        })
    }
}

fn prefixes(field: &str, raw: Option<Vec<String>>, default: &[&str]) -> anyhow::Result<Vec<String>> {
    match raw {
        None => Ok(default.iter().map(ToString::to_string).collect()),
        Some(prefixes) => {
            if prefixes.iter().any(|p| p.is_empty()) {
                // An empty prefix matches every interface name.
                return Err(anyhow!("{} must not contain an empty prefix", field));
            }
            Ok(prefixes)
        }
    }
}
