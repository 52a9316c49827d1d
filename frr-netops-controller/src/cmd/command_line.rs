use std::convert::TryInto;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use structopt::StructOpt;
use tracing_subscriber::filter::LevelFilter;

use crate::net::config::Config;
use crate::raw_config::RawConfig;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "frr-netops",
    about = "Interface follow-up tasks after an FRR state change."
)]
pub struct Opt {
    /// path of a json or yaml config file, built-in defaults are used without it
    #[structopt(short, long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    // The number of occurrences of the `v/verbose` flag
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Send gratuitous ARP on every real interface that is up.
    Garp,

    /// Point the SNMP daemon agentaddress at the IPv4 address of an interface.
    Agentaddress {
        /// The interface on which SNMPD is listening.
        #[structopt(short, long)]
        interface: String,

        /// SNMPD configuration file, overrides the config file.
        #[structopt(long, parse(from_os_str))]
        snmpd_conf: Option<PathBuf>,
    },

    /// Remove all IP addresses from every non-virtual interface.
    Flush {
        /// Interface whose addresses are kept, may be repeated.
        #[structopt(short, long)]
        exclude: Vec<String>,
    },
}

impl Opt {
    pub fn get_level_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn from_args_checked() -> Result<Self> {
        Self::from_args_safe()?.checked()
    }

    fn checked(self) -> Result<Self> {
        if let Command::Agentaddress { interface, .. } = &self.cmd {
            if interface.trim().is_empty() {
                return Err(anyhow!("interface name must not be empty, use `-h | --help` for more details"));
            }
        }
        Ok(self)
    }
}

pub fn get_config_from_opt(opt: &Opt) -> Result<Config> {
    match opt.config {
        None => RawConfig::default(),
        Some(ref path_buf) => {
            let buffer = std::fs::read_to_string(path_buf)
                .context(format!("failed to read config file {:?}", path_buf))?;
            parse_raw_config(path_buf, &buffer)?
        }
    }
    .try_into()
}

fn parse_raw_config(path_buf: &Path, buffer: &str) -> Result<RawConfig> {
    Ok(match path_buf.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(buffer)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(buffer)?,
        _ => return Err(anyhow!("invalid file extension")),
    })
}
