use std::fmt;

use crate::error::{EnumerationError, TransmissionError};
use crate::net::classifier::{Classifier, SkipReason};
use crate::net::frame::{ArpOperation, EthernetArpFrame};
use crate::net::inventory::{InterfaceInfo, Inventory};
use crate::net::transmit::Transmit;

#[derive(Debug)]
pub enum Outcome {
    Announced { frames: usize },
    Skipped(SkipReason),
    /// `sent` frames went out before `error` stopped this interface.
    Failed { sent: usize, error: TransmissionError },
}

#[derive(Debug)]
pub struct InterfaceReport {
    pub name: String,
    pub outcome: Outcome,
}

impl fmt::Display for InterfaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Announced { frames } => write!(f, "{}: announced ({} frames)", self.name, frames),
            Outcome::Skipped(reason) => write!(f, "{}: skipped ({})", self.name, reason),
            Outcome::Failed { sent, error } => {
                write!(f, "{}: failed after {} frames: {}", self.name, sent, error)
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub announced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_reports(reports: &[InterfaceReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            match report.outcome {
                Outcome::Announced { .. } => summary.announced += 1,
                Outcome::Skipped(_) => summary.skipped += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
            summary
        })
    }
}

/// One gratuitous ARP pass over the host interfaces.
pub struct Announcer<I, T> {
    inventory: I,
    transmitter: T,
    classifier: Classifier,
}

impl<I: Inventory, T: Transmit> Announcer<I, T> {
    pub fn new(inventory: I, transmitter: T, classifier: Classifier) -> Self {
        Self {
            inventory,
            transmitter,
            classifier,
        }
    }

    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    /// Interfaces are handled one at a time; a failure on one never stops
    /// the others. Only a failed enumeration aborts the run.
    pub fn run(&mut self) -> Result<Vec<InterfaceReport>, EnumerationError> {
        let interfaces = self.inventory.list_interfaces()?;
        tracing::debug!("announcing over {} interfaces", interfaces.len());

        let reports: Vec<InterfaceReport> = interfaces
            .iter()
            .map(|info| {
                let outcome = self.announce(info);
                match &outcome {
                    Outcome::Announced { frames } => {
                        tracing::info!("interface {} announced with {} frames", info.name, frames)
                    }
                    Outcome::Skipped(reason) => {
                        tracing::debug!("interface {} skipped: {}", info.name, reason)
                    }
                    Outcome::Failed { error, .. } => {
                        tracing::error!("gratuitous arp on {} failed: {}", info.name, error)
                    }
                }
                InterfaceReport {
                    name: info.name.clone(),
                    outcome,
                }
            })
            .collect();

        let summary = Summary::from_reports(&reports);
        tracing::info!(
            "gratuitous arp done, announced {} skipped {} failed {}",
            summary.announced,
            summary.skipped,
            summary.failed
        );
        Ok(reports)
    }

    fn announce(&mut self, info: &InterfaceInfo) -> Outcome {
        let (mac, ip) = match self.classifier.classify(info) {
            Ok(addrs) => addrs,
            Err(reason) => return Outcome::Skipped(reason),
        };

        let mut frames = vec![EthernetArpFrame::announcement(
            mac,
            ip,
            ArpOperation::Request,
            ip,
        )];
        if let Some(broadcast) = info.broadcast_address {
            frames.push(EthernetArpFrame::announcement(
                mac,
                ip,
                ArpOperation::Reply,
                broadcast,
            ));
        }

        let mut sent = 0;
        for frame in &frames {
            if let Err(error) = self.transmitter.transmit(&info.name, frame) {
                return Outcome::Failed { sent, error };
            }
            sent += 1;
        }
        Outcome::Announced { frames: sent }
    }
}
