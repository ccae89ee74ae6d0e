use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use concord_common::{AbstractionId, Message, Payload, ProcessId, Value};
use tracing::debug;

use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::membership::Membership;

/// Timestamped value snapshot handed from an aborted epoch to the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpState {
    pub value_timestamp: u64,
    pub value: Value,
}

/// Read/write epoch consensus for a single epoch `ets`.
///
/// The leader reads the states of a majority, adopts the freshest defined
/// value, writes it to a majority and then announces the decision. Once
/// aborted the instance ignores every further input.
pub struct EpochConsensus {
    id: AbstractionId,
    parent: AbstractionId,
    membership: Arc<Membership>,
    ets: u64,
    state: EpState,
    tmp_val: Value,
    states: HashMap<ProcessId, EpState>,
    accepted: HashSet<ProcessId>,
    aborted: bool,
}

impl EpochConsensus {
    pub fn new(
        id: AbstractionId,
        parent: AbstractionId,
        membership: Arc<Membership>,
        ets: u64,
        state: EpState,
    ) -> Self {
        Self {
            id,
            parent,
            membership,
            ets,
            state,
            tmp_val: Value::UNDEFINED,
            states: HashMap::new(),
            accepted: HashSet::new(),
            aborted: false,
        }
    }

    pub fn state(&self) -> EpState {
        self.state
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    fn broadcast(&self, payload: Payload, ctx: &mut Context) {
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.beb(),
            Payload::BebBroadcast {
                message: Box::new(Message::new(self.id.clone(), self.id.clone(), payload)),
            },
        ));
    }

    fn reply(&self, to: ProcessId, payload: Payload, ctx: &mut Context) {
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.pl(),
            Payload::PlSend {
                destination: Some(to),
                message: Box::new(Message::new(self.id.clone(), self.id.clone(), payload)),
            },
        ));
    }

    /// Highest valTs wins. At equal valTs a written value beats the initial
    /// undefined state, since epoch 0 writes carry the same stamp; remaining
    /// ties go to the higher sender rank.
    fn highest(&self) -> Option<EpState> {
        self.states
            .iter()
            .max_by_key(|(sender, s)| (s.value_timestamp, s.value.is_defined(), sender.rank))
            .map(|(_, s)| *s)
    }

    fn on_state(&mut self, sender: ProcessId, reply: EpState, ctx: &mut Context) {
        self.states.insert(sender, reply);
        if !self.membership.is_quorum(self.states.len()) {
            return;
        }

        if let Some(highest) = self.highest() {
            if highest.value.is_defined() {
                self.tmp_val = highest.value;
            }
        }
        self.states.clear();
        debug!("{} writing {}", self.id, self.tmp_val);
        self.broadcast(Payload::EpInternalWrite { value: self.tmp_val }, ctx);
    }

    fn on_accept(&mut self, sender: ProcessId, ctx: &mut Context) {
        self.accepted.insert(sender);
        if !self.membership.is_quorum(self.accepted.len()) {
            return;
        }

        self.accepted.clear();
        self.broadcast(Payload::EpInternalDecided { value: self.tmp_val }, ctx);
    }
}

impl Abstraction for EpochConsensus {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        if self.aborted {
            return Ok(());
        }

        match message.payload {
            Payload::EpPropose { value } => {
                self.tmp_val = value;
                self.broadcast(Payload::EpInternalRead, ctx);
            }
            Payload::EpAbort => {
                tracing::info!(target: "consensus", "EVENT:ABORT system={} id={} ets={}", self.membership.system_id, self.id, self.ets);
                ctx.emit(Message::new(
                    self.id.clone(),
                    self.parent.clone(),
                    Payload::EpAborted {
                        ets: self.ets,
                        value_timestamp: self.state.value_timestamp,
                        value: self.state.value,
                    },
                ));
                self.aborted = true;
            }
            Payload::BebDeliver { sender, message: inner } => match inner.payload {
                Payload::EpInternalRead => {
                    let s = self.state;
                    self.reply(
                        sender,
                        Payload::EpInternalState { value_timestamp: s.value_timestamp, value: s.value },
                        ctx,
                    );
                }
                Payload::EpInternalWrite { value } => {
                    self.state = EpState { value_timestamp: self.ets, value };
                    self.reply(sender, Payload::EpInternalAccept, ctx);
                }
                Payload::EpInternalDecided { value } => {
                    ctx.emit(Message::new(
                        self.id.clone(),
                        self.parent.clone(),
                        Payload::EpDecide { ets: self.ets, value },
                    ));
                }
                _ => return Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            Payload::PlDeliver { sender, message: inner } => match inner.payload {
                Payload::EpInternalState { value_timestamp, value } => {
                    self.on_state(sender, EpState { value_timestamp, value }, ctx);
                }
                Payload::EpInternalAccept => self.on_accept(sender, ctx),
                _ => return Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            _ => return Err(ConsensusError::unsupported(&self.id, &message)),
        }
        Ok(())
    }
}
