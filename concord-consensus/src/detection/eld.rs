use std::collections::HashSet;
use std::sync::Arc;

use concord_common::{utils::max_rank, AbstractionId, Message, Payload, ProcessId};
use tracing::info;

use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::membership::Membership;

/// Eventual leader detector: trusts the highest-rank process not suspected.
pub struct Eld {
    id: AbstractionId,
    parent: AbstractionId,
    system_id: String,
    alive: HashSet<ProcessId>,
    leader: Option<ProcessId>,
}

impl Eld {
    pub fn new(id: AbstractionId, parent: AbstractionId, membership: Arc<Membership>) -> Self {
        Self {
            id,
            parent,
            system_id: membership.system_id.clone(),
            alive: membership.processes.iter().cloned().collect(),
            leader: None,
        }
    }

    pub fn leader(&self) -> Option<&ProcessId> {
        self.leader.as_ref()
    }

    fn update_leader(&mut self, ctx: &mut Context) -> Result<(), ConsensusError> {
        let candidate = max_rank(&self.alive)
            .cloned()
            .ok_or(ConsensusError::NoLeaderCandidate)?;

        if self.leader.as_ref() != Some(&candidate) {
            info!("👑 New leader trusted: {}", candidate);
            tracing::info!(target: "consensus", "EVENT:TRUST system={} leader={}", self.system_id, candidate);
            self.leader = Some(candidate.clone());
            ctx.emit(Message::new(
                self.id.clone(),
                self.parent.clone(),
                Payload::EldTrust { process: candidate },
            ));
        }
        Ok(())
    }
}

impl Abstraction for Eld {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::EpfdSuspect { process } => {
                self.alive.remove(&process);
            }
            Payload::EpfdRestore { process } => {
                self.alive.insert(process);
            }
            _ => return Err(ConsensusError::unsupported(&self.id, &message)),
        }
        self.update_leader(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstraction::testing::{context, drain, membership, process};

    fn eld_id() -> AbstractionId {
        AbstractionId::consensus("t").ec().eld()
    }

    fn build() -> Eld {
        Eld::new(eld_id(), eld_id().parent().unwrap(), membership(3, 1))
    }

    fn suspect(i: u32) -> Message {
        Message::new(eld_id().epfd(), eld_id(), Payload::EpfdSuspect { process: process(i) })
    }

    fn restore(i: u32) -> Message {
        Message::new(eld_id().epfd(), eld_id(), Payload::EpfdRestore { process: process(i) })
    }

    fn trusted(out: &[Message]) -> Vec<u32> {
        out.iter()
            .filter_map(|m| match &m.payload {
                Payload::EldTrust { process } => Some(process.rank),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_trust_follows_max_alive_rank() {
        let mut eld = build();
        let (mut ctx, mut rx) = context();

        eld.handle(suspect(3), &mut ctx).unwrap();
        assert_eq!(trusted(&drain(&mut rx)), vec![2]);

        eld.handle(restore(3), &mut ctx).unwrap();
        assert_eq!(trusted(&drain(&mut rx)), vec![3]);
        assert_eq!(eld.leader().map(|p| p.rank), Some(3));
    }

    #[test]
    fn test_trust_not_repeated_for_same_leader() {
        let mut eld = build();
        let (mut ctx, mut rx) = context();

        eld.handle(suspect(3), &mut ctx).unwrap();
        eld.handle(suspect(1), &mut ctx).unwrap();
        eld.handle(restore(1), &mut ctx).unwrap();
        eld.handle(suspect(1), &mut ctx).unwrap();

        assert_eq!(trusted(&drain(&mut rx)), vec![2]);
    }

    #[test]
    fn test_empty_alive_set_is_an_error() {
        let mut eld = build();
        let (mut ctx, _rx) = context();

        eld.handle(suspect(1), &mut ctx).unwrap();
        eld.handle(suspect(2), &mut ctx).unwrap();
        assert!(matches!(eld.handle(suspect(3), &mut ctx), Err(ConsensusError::NoLeaderCandidate)));
    }
}
