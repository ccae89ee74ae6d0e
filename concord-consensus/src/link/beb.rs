use std::sync::Arc;

use concord_common::{AbstractionId, Message, Payload};

use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::membership::Membership;

/// Best-effort broadcast: one link send per member, self included.
pub struct BestEffortBroadcast {
    id: AbstractionId,
    membership: Arc<Membership>,
}

impl BestEffortBroadcast {
    pub fn new(id: AbstractionId, membership: Arc<Membership>) -> Self {
        Self { id, membership }
    }
}

impl Abstraction for BestEffortBroadcast {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::BebBroadcast { message: inner } => {
                for p in &self.membership.processes {
                    ctx.emit(Message::new(
                        self.id.clone(),
                        self.id.pl(),
                        Payload::PlSend {
                            destination: Some(p.clone()),
                            message: inner.clone(),
                        },
                    ));
                }
                Ok(())
            }
            Payload::PlDeliver { sender, message: inner } => {
                // The inner message names the abstraction it is meant for.
                let to = inner.to.clone();
                ctx.emit(Message::new(
                    self.id.clone(),
                    to,
                    Payload::BebDeliver { sender, message: inner },
                ));
                Ok(())
            }
            _ => Err(ConsensusError::unsupported(&self.id, &message)),
        }
    }
}
