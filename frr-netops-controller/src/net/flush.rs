use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use futures::TryStreamExt;
use rtnetlink::packet::link::nlas::Nla;
use rtnetlink::packet::AddressMessage;
use rtnetlink::{new_connection, Handle};

use crate::error::{EnumerationError, FlushError};
use crate::net::classifier::Classifier;

pub const DEFAULT_VIRTUAL_PREFIXES: &[&str] =
    &["lo", "docker", "veth", "br-", "virbr", "vmnet", "vme"];

/// Which links keep their addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushPolicy {
    pub virtual_prefixes: Classifier,
    pub excluded: BTreeSet<String>,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            virtual_prefixes: Classifier::new(DEFAULT_VIRTUAL_PREFIXES.iter().copied()),
            excluded: BTreeSet::new(),
        }
    }
}

impl FlushPolicy {
    pub fn exclude<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.excluded.extend(names);
        self
    }

    pub fn skip_reason(&self, name: &str) -> Option<FlushSkip> {
        if self.virtual_prefixes.is_excluded(name) {
            Some(FlushSkip::Virtual)
        } else if self.excluded.contains(name) {
            Some(FlushSkip::Excluded)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushSkip {
    Virtual,
    Excluded,
}

#[derive(Debug)]
pub enum FlushOutcome {
    Flushed { removed: usize },
    Skipped(FlushSkip),
    Failed(FlushError),
}

#[derive(Debug)]
pub struct FlushReport {
    pub name: String,
    pub outcome: FlushOutcome,
}

impl fmt::Display for FlushReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            FlushOutcome::Flushed { removed } => {
                write!(f, "{}: flushed {} addresses", self.name, removed)
            }
            FlushOutcome::Skipped(FlushSkip::Virtual) => write!(f, "{}: skipped (virtual)", self.name),
            FlushOutcome::Skipped(FlushSkip::Excluded) => write!(f, "{}: skipped (excluded)", self.name),
            FlushOutcome::Failed(e) => write!(f, "{}: failed: {}", self.name, e),
        }
    }
}

/// The kernel's answer to an address that went away with its primary.
const EADDRNOTAVAIL: i32 = 99;

#[async_trait]
pub trait LinkTable {
    type Address: fmt::Debug + Send;

    async fn links(&self) -> Result<Vec<Link>, EnumerationError>;

    async fn addresses(&self, link: &Link) -> Result<Vec<Self::Address>, FlushError>;

    /// `Ok(false)` when the address was already gone, as secondaries are
    /// once their primary is deleted.
    async fn delete(&self, address: Self::Address) -> Result<bool, String>;
}

pub struct NetlinkTable {
    handle: Handle,
}

impl NetlinkTable {
    /// Must be called from within a tokio runtime, the connection task is spawned on it.
    pub fn new() -> std::io::Result<Self> {
        let (connection, handle, _) = new_connection()?;
        tokio::spawn(connection);
        Ok(Self { handle })
    }
}

#[async_trait]
impl LinkTable for NetlinkTable {
    type Address = AddressMessage;

    async fn links(&self) -> Result<Vec<Link>, EnumerationError> {
        let mut links = self.handle.link().get().execute();
        let mut out = vec![];
        while let Some(msg) = links
            .try_next()
            .await
            .map_err(|e| EnumerationError::Netlink(e.to_string()))?
        {
            let name = msg.nlas.iter().find_map(|nla| match nla {
                Nla::IfName(name) => Some(name.clone()),
                _ => None,
            });
            match name {
                Some(name) => out.push(Link {
                    index: msg.header.index,
                    name,
                }),
                None => tracing::debug!("link {} has no name, ignored", msg.header.index),
            }
        }
        Ok(out)
    }

    async fn addresses(&self, link: &Link) -> Result<Vec<AddressMessage>, FlushError> {
        let mut stream = self
            .handle
            .address()
            .get()
            .set_link_index_filter(link.index)
            .execute();
        let mut addresses = vec![];
        while let Some(msg) = stream.try_next().await.map_err(|e| FlushError::List {
            interface: link.name.clone(),
            message: e.to_string(),
        })? {
            addresses.push(msg);
        }
        Ok(addresses)
    }

    async fn delete(&self, address: AddressMessage) -> Result<bool, String> {
        match self.handle.address().del(address).execute().await {
            Ok(()) => Ok(true),
            Err(rtnetlink::Error::NetlinkError(ref e)) if e.code == -EADDRNOTAVAIL => Ok(false),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Deletes every address of `link`. A failed delete does not stop the
/// others, the first failure is reported once all were attempted.
pub async fn flush_link<T: LinkTable>(table: &T, link: &Link) -> Result<usize, FlushError> {
    let addresses = table.addresses(link).await?;
    let mut removed = 0;
    let mut failure = None;
    for address in addresses {
        tracing::trace!("deleting address {:?} from {}", address, link.name);
        match table.delete(address).await {
            Ok(true) => removed += 1,
            Ok(false) => tracing::debug!("address on {} was already removed", link.name),
            Err(message) => {
                tracing::warn!("failed to delete address from {}: {}", link.name, message);
                failure.get_or_insert(message);
            }
        }
    }
    match failure {
        Some(message) => Err(FlushError::Delete {
            interface: link.name.clone(),
            message,
        }),
        None => Ok(removed),
    }
}

/// Flushes links one at a time. A failing link is reported and the run
/// goes on; only a failed link listing aborts.
pub async fn flush_addresses<T: LinkTable>(
    table: &T,
    policy: &FlushPolicy,
) -> Result<Vec<FlushReport>, EnumerationError> {
    let links = table.links().await?;
    let mut reports = Vec::with_capacity(links.len());
    for link in links {
        tracing::debug!("index {} name {}", link.index, link.name);
        let outcome = match policy.skip_reason(&link.name) {
            Some(skip) => FlushOutcome::Skipped(skip),
            None => match flush_link(table, &link).await {
                Ok(removed) => {
                    tracing::info!("flushed {} addresses from {}", removed, link.name);
                    FlushOutcome::Flushed { removed }
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    FlushOutcome::Failed(e)
                }
            },
        };
        reports.push(FlushReport {
            name: link.name,
            outcome,
        });
    }
    Ok(reports)
}
