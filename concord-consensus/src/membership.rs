use concord_common::{utils::max_rank, Endpoint, ProcessId};

use crate::error::ConsensusError;

/// Static view of a run: who we are, who else takes part, where the hub is.
#[derive(Debug, Clone)]
pub struct Membership {
    pub system_id: String,
    pub own: ProcessId,
    pub processes: Vec<ProcessId>,
    pub hub: Endpoint,
}

impl Membership {
    /// Locates the own process in `processes` by owner and index.
    pub fn locate(
        system_id: impl Into<String>,
        owner: &str,
        index: u32,
        processes: Vec<ProcessId>,
        hub: Endpoint,
    ) -> Result<Self, ConsensusError> {
        let own = processes
            .iter()
            .find(|p| p.owner == owner && p.index == index)
            .cloned()
            .ok_or_else(|| ConsensusError::UnknownProcess {
                owner: owner.to_string(),
                index,
            })?;

        Ok(Self {
            system_id: system_id.into(),
            own,
            processes,
            hub,
        })
    }

    pub fn n(&self) -> usize {
        self.processes.len()
    }

    /// Strict majority: more than N/2.
    pub fn is_quorum(&self, count: usize) -> bool {
        count > self.n() / 2
    }

    /// Highest-rank member. The own process is always a member, so this never fails.
    pub fn leader_candidate(&self) -> &ProcessId {
        max_rank(&self.processes).unwrap_or(&self.own)
    }

    /// Resolves the sender of a network message by its listening endpoint.
    pub fn sender_at(&self, host: &str, port: u16) -> Option<ProcessId> {
        if let Some(p) = self.processes.iter().find(|p| p.listens_on(host, port)) {
            return Some(p.clone());
        }
        if self.hub.host == host && self.hub.port == port {
            return Some(ProcessId::hub(&self.hub));
        }
        None
    }

    pub fn is_self(&self, process: &ProcessId) -> bool {
        self.own.is(process)
    }
}
