use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::errors::AddressError;

/// A `host:port` pair a transport can reach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressError::InvalidEndpoint(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidEndpoint(s.to_string()))?;
        if host.is_empty() {
            return Err(AddressError::InvalidEndpoint(s.to_string()));
        }
        Ok(Endpoint::new(host, port))
    }
}

/// Identity of one process taking part in a run.
///
/// `owner` + `index` name the process, `rank` orders it against every other
/// member of the same run (leader election, register write tie-break).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId {
    pub host: String,
    pub port: u16,
    pub owner: String,
    pub index: u32,
    pub rank: u32,
}

impl ProcessId {
    pub fn new(host: impl Into<String>, port: u16, owner: impl Into<String>, index: u32, rank: u32) -> Self {
        Self {
            host: host.into(),
            port,
            owner: owner.into(),
            index,
            rank,
        }
    }

    /// Pseudo-process standing for the hub when it shows up as a sender.
    pub fn hub(endpoint: &Endpoint) -> Self {
        Self::new(endpoint.host.clone(), endpoint.port, "hub", 0, 0)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Same process as `other`, compared by owner and index only.
    pub fn is(&self, other: &ProcessId) -> bool {
        self.owner == other.owner && self.index == other.index
    }

    pub fn listens_on(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}(r{})", self.owner, self.index, self.rank)
    }
}

/// Highest-rank process of `processes`, `None` when empty.
pub fn max_rank<'a, I>(processes: I) -> Option<&'a ProcessId>
where
    I: IntoIterator<Item = &'a ProcessId>,
{
    processes.into_iter().max_by_key(|p| p.rank)
}
