use std::sync::Arc;

use concord_common::{AbstractionId, Message, Payload, ProcessId, Value};
use tracing::{debug, info};

use super::ep::EpState;
use super::epoch_subtree;
use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::membership::Membership;

/// Leader-driven uniform consensus for one topic.
///
/// Sequences epoch consensus instances handed over by epoch change: on every
/// new epoch the current instance is aborted and a fresh one is seeded with
/// its state. Decides at most once.
pub struct UniformConsensus {
    id: AbstractionId,
    topic: String,
    membership: Arc<Membership>,
    val: Value,
    proposed: bool,
    decided: bool,
    ets: u64,
    leader: ProcessId,
    new_ts: u64,
    new_leader: Option<ProcessId>,
}

impl UniformConsensus {
    pub fn new(topic: &str, membership: Arc<Membership>) -> Self {
        let leader = membership.leader_candidate().clone();
        Self {
            id: AbstractionId::consensus(topic),
            topic: topic.to_string(),
            membership,
            val: Value::UNDEFINED,
            proposed: false,
            decided: false,
            ets: 0,
            leader,
            new_ts: 0,
            new_leader: None,
        }
    }

    pub fn ets(&self) -> u64 {
        self.ets
    }

    pub fn leader(&self) -> &ProcessId {
        &self.leader
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    fn on_aborted(&mut self, state: EpState, ctx: &mut Context) {
        let Some(leader) = self.new_leader.take() else {
            return;
        };

        ctx.retire(self.id.ep(self.ets));
        self.ets = self.new_ts;
        self.leader = leader;
        self.proposed = false;
        tracing::info!(target: "consensus", "EVENT:START_EPOCH system={} topic={} ets={} leader={}", self.membership.system_id, self.topic, self.ets, self.leader);

        for (id, abstraction) in epoch_subtree(&self.id, self.ets, state, &self.membership) {
            ctx.register(id, abstraction);
        }
    }

    fn on_decide(&mut self, value: Value, ctx: &mut Context) {
        self.decided = true;
        tracing::info!(target: "consensus", "EVENT:DECIDE system={} topic={} value={}", self.membership.system_id, self.topic, value);
        info!("✅ {} decided {}", self.id, value);
        ctx.emit(Message::new(self.id.clone(), AbstractionId::app(), Payload::UcDecide { value }));
    }

    /// Proposes the client value once per epoch when this process leads it.
    fn try_propose(&mut self, ctx: &mut Context) {
        if self.proposed || !self.val.is_defined() || !self.membership.is_self(&self.leader) {
            return;
        }

        self.proposed = true;
        debug!("{} proposing {} in epoch {}", self.id, self.val, self.ets);
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.ep(self.ets),
            Payload::EpPropose { value: self.val },
        ));
    }
}

impl Abstraction for UniformConsensus {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::UcPropose { value } => {
                self.val = value;
            }
            Payload::EcStartEpoch { new_timestamp, new_leader } => {
                self.new_ts = new_timestamp;
                self.new_leader = Some(new_leader);
                ctx.emit(Message::new(self.id.clone(), self.id.ep(self.ets), Payload::EpAbort));
            }
            Payload::EpAborted { ets, value_timestamp, value } => {
                if ets == self.ets {
                    self.on_aborted(EpState { value_timestamp, value }, ctx);
                }
            }
            Payload::EpDecide { ets, value } => {
                if ets == self.ets && !self.decided {
                    self.on_decide(value, ctx);
                }
            }
            _ => return Err(ConsensusError::unsupported(&self.id, &message)),
        }

        self.try_propose(ctx);
        Ok(())
    }
}
