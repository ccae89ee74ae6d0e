use std::sync::Arc;

use concord_common::{AbstractionId, Message, Payload, ProcessId};
use tracing::debug;

use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::membership::Membership;

/// Leader-based epoch change.
///
/// Each process mints timestamps in its own residue class: the seed is its
/// rank and every new epoch advances it by N until it exceeds the last
/// accepted timestamp, so two processes never announce the same epoch.
///
/// A stale announcement from the trusted leader is answered with a NACK so it
/// re-asserts with a fresh timestamp. Announcements from untrusted proposers
/// are dropped; when trust later moves to another process, that process is
/// NACKed so it announces an epoch everyone trusting it can accept.
pub struct EpochChange {
    id: AbstractionId,
    parent: AbstractionId,
    membership: Arc<Membership>,
    trusted: ProcessId,
    last_ts: u64,
    ts: u64,
}

impl EpochChange {
    pub fn new(id: AbstractionId, parent: AbstractionId, membership: Arc<Membership>) -> Self {
        let trusted = membership.leader_candidate().clone();
        let ts = membership.own.rank as u64;
        Self {
            id,
            parent,
            membership,
            trusted,
            last_ts: 0,
            ts,
        }
    }

    pub fn trusted(&self) -> &ProcessId {
        &self.trusted
    }

    pub fn last_ts(&self) -> u64 {
        self.last_ts
    }

    /// Starts a new epoch if this process is the trusted leader.
    fn assert_leadership(&mut self, ctx: &mut Context) {
        if !self.membership.is_self(&self.trusted) {
            return;
        }

        let n = self.membership.n().max(1) as u64;
        self.ts += n;
        if self.ts <= self.last_ts {
            self.ts += ((self.last_ts - self.ts) / n + 1) * n;
        }

        tracing::info!(target: "consensus", "EVENT:NEW_EPOCH system={} id={} ts={}", self.membership.system_id, self.id, self.ts);
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.beb(),
            Payload::BebBroadcast {
                message: Box::new(Message::new(
                    self.id.clone(),
                    self.id.clone(),
                    Payload::EcInternalNewEpoch { timestamp: self.ts },
                )),
            },
        ));
    }

    fn on_new_epoch(&mut self, sender: ProcessId, timestamp: u64, ctx: &mut Context) {
        if sender.is(&self.trusted) && timestamp > self.last_ts {
            self.last_ts = timestamp;
            ctx.emit(Message::new(
                self.id.clone(),
                self.parent.clone(),
                Payload::EcStartEpoch {
                    new_timestamp: timestamp,
                    new_leader: sender,
                },
            ));
            return;
        }

        if !sender.is(&self.trusted) {
            debug!("{} ignoring epoch {} from untrusted {}", self.id, timestamp, sender);
            return;
        }

        debug!("{} rejecting stale epoch {} (last {})", self.id, timestamp, self.last_ts);
        self.nack(sender, ctx);
    }

    fn nack(&self, to: ProcessId, ctx: &mut Context) {
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.pl(),
            Payload::PlSend {
                destination: Some(to),
                message: Box::new(Message::new(self.id.clone(), self.id.clone(), Payload::EcInternalNack)),
            },
        ));
    }
}

impl Abstraction for EpochChange {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::EldTrust { process } => {
                if !process.is(&self.trusted) && !self.membership.is_self(&process) {
                    self.nack(process.clone(), ctx);
                }
                self.trusted = process;
                self.assert_leadership(ctx);
                Ok(())
            }
            Payload::PlDeliver { message: inner, .. } => match inner.payload {
                Payload::EcInternalNack => {
                    self.assert_leadership(ctx);
                    Ok(())
                }
                _ => Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            Payload::BebDeliver { sender, message: inner } => match inner.payload {
                Payload::EcInternalNewEpoch { timestamp } => {
                    self.on_new_epoch(sender, timestamp, ctx);
                    Ok(())
                }
                _ => Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            _ => Err(ConsensusError::unsupported(&self.id, &message)),
        }
    }
}
