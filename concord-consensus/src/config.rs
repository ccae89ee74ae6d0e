use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Initial EPFD timeout and its increment.
pub const DEFAULT_EPFD_DELTA: Duration = Duration::from_millis(100);

/// Messages parked for epoch instances that do not exist yet, per run.
pub const DEFAULT_MAX_PARKED: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub epfd_delta: Duration,
    pub max_parked: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            epfd_delta: DEFAULT_EPFD_DELTA,
            max_parked: DEFAULT_MAX_PARKED,
        }
    }
}

impl ConsensusConfig {
    pub fn with_epfd_delta(mut self, delta: Duration) -> Self {
        self.epfd_delta = delta;
        self
    }
}
