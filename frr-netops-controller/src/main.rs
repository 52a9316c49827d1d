use std::process::exit;

use anyhow::Context;
use frr_netops_controller_lib::cmd::command_line::{get_config_from_opt, Command, Opt};
use frr_netops_controller_lib::net::announce::{Announcer, Outcome};
use frr_netops_controller_lib::net::config::Config;
use frr_netops_controller_lib::net::flush::{flush_addresses, FlushOutcome, NetlinkTable};
use frr_netops_controller_lib::net::inventory::{Broadcasts, HostInventory};
use frr_netops_controller_lib::net::snmp::patch_agent_address;
use frr_netops_controller_lib::net::transmit::LinkTransmitter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = match Opt::from_args_checked() {
        Err(e) => {
            println!("{}", e);
            exit(1)
        }
        Ok(o) => o,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(opt.get_level_filter().into()))
        .init();

    let config = get_config_from_opt(&opt)?;
    tracing::debug!("loaded config {:?}", config);

    let code = match opt.cmd {
        Command::Garp => garp(config).await,
        Command::Agentaddress {
            ref interface,
            ref snmpd_conf,
        } => {
            let mut snmp = config.snmp;
            if let Some(path) = snmpd_conf {
                snmp.path = path.clone();
            }
            match patch_agent_address(&HostInventory::default(), interface, &snmp) {
                Ok(report) => {
                    println!("{}: {}", report.interface, report.directive);
                    0
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    eprintln!("Error: {}", e);
                    e.exit_code()
                }
            }
        }
        Command::Flush { ref exclude } => flush(config, exclude.clone()).await?,
    };
    if code != 0 {
        exit(code);
    }
    Ok(())
}

async fn garp(config: Config) -> i32 {
    let broadcasts = match Broadcasts::from_kernel().await {
        Ok(broadcasts) => broadcasts,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut announcer = Announcer::new(HostInventory::new(broadcasts), LinkTransmitter, config.classifier);
    match announcer.run() {
        Ok(reports) => {
            for report in &reports {
                println!("{}", report);
            }
            if reports
                .iter()
                .any(|r| matches!(r.outcome, Outcome::Failed { .. }))
            {
                1
            } else {
                0
            }
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn flush(config: Config, exclude: Vec<String>) -> anyhow::Result<i32> {
    let table = NetlinkTable::new().context("failed to open rtnetlink connection")?;
    let policy = config.flush.exclude(exclude);
    let reports = match flush_addresses(&table, &policy).await {
        Ok(reports) => reports,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            return Ok(1);
        }
    };
    for report in &reports {
        println!("{}", report);
    }
    let failed = reports
        .iter()
        .any(|r| matches!(r.outcome, FlushOutcome::Failed(_)));
    Ok(if failed { 1 } else { 0 })
}
