use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use concord_common::{ConcordError, Endpoint};
use concord_consensus::ConsensusConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Args;

pub const DEFAULT_HUB: &str = "127.0.0.1:5000";
pub const DEFAULT_PORT: u16 = 5004;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub owner: String,
    pub index: u32,
    pub host: String,
    pub port: u16,
    pub hub_address: String,
    pub epfd_delta_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: "concord".to_string(),
            index: 1,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            hub_address: DEFAULT_HUB.to_string(),
            epfd_delta_ms: ConsensusConfig::default().epfd_delta.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let parsed = serde_json::from_str::<Config>(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(parsed)
    }

    /// Command-line flags win over file values.
    pub fn with_overrides(mut self, args: &Args) -> Self {
        if let Some(owner) = &args.owner {
            self.owner = owner.clone();
        }
        if let Some(index) = args.index {
            self.index = index;
        }
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(hub) = &args.hub {
            self.hub_address = hub.clone();
        }
        self
    }

    pub fn hub_endpoint(&self) -> Result<Endpoint, ConcordError> {
        Ok(self.hub_address.parse::<Endpoint>()?)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn consensus(&self) -> Result<ConsensusConfig, ConcordError> {
        if self.epfd_delta_ms == 0 {
            return Err(ConcordError::Config("epfd_delta_ms must be positive".to_string()));
        }
        Ok(ConsensusConfig::default().with_epfd_delta(Duration::from_millis(self.epfd_delta_ms)))
    }
}
