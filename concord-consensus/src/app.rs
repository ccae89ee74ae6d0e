//! The application boundary: translates hub requests into register and
//! consensus operations, and their results back into hub replies.

use std::sync::Arc;

use concord_common::{AbstractionId, Family, Message, Payload};
use tracing::{debug, info};

use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::link::links_for;
use crate::membership::Membership;

pub struct App {
    id: AbstractionId,
    system_id: String,
}

impl App {
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            id: AbstractionId::app(),
            system_id: system_id.into(),
        }
    }

    /// Replies travel over `app.pl` with no destination, i.e. to the hub.
    fn to_hub(&self, payload: Payload, ctx: &mut Context) {
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.pl(),
            Payload::PlSend {
                destination: None,
                message: Box::new(Message::new(self.id.clone(), AbstractionId::hub(), payload)),
            },
        ));
    }

    fn on_request(&mut self, request: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        let (to, payload) = match request.payload {
            Payload::AppWrite { register, value } => {
                (AbstractionId::register(&register), Payload::NnarWrite { value })
            }
            Payload::AppRead { register } => (AbstractionId::register(&register), Payload::NnarRead),
            Payload::AppPropose { topic, value } => {
                (AbstractionId::consensus(&topic), Payload::UcPropose { value })
            }
            Payload::AppBroadcast { value } => {
                let inner = Message::new(self.id.clone(), self.id.clone(), Payload::AppValue { value });
                (self.id.beb(), Payload::BebBroadcast { message: Box::new(inner) })
            }
            _ => return Err(ConsensusError::unsupported(&self.id, &request)),
        };

        debug!("{} {} -> {}", self.system_id, payload.kind(), to);
        ctx.emit(Message::new(self.id.clone(), to, payload));
        Ok(())
    }
}

impl Abstraction for App {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::PlDeliver { message: inner, .. } => self.on_request(*inner, ctx),
            Payload::BebDeliver { message: inner, .. } => match inner.payload {
                Payload::AppValue { value } => {
                    self.to_hub(Payload::AppValue { value }, ctx);
                    Ok(())
                }
                _ => Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            Payload::NnarWriteReturn => {
                let register = register_of(&message.from)?;
                self.to_hub(Payload::AppWriteReturn { register }, ctx);
                Ok(())
            }
            Payload::NnarReadReturn { value } => {
                let register = register_of(&message.from)?;
                self.to_hub(Payload::AppReadReturn { register, value }, ctx);
                Ok(())
            }
            Payload::UcDecide { value } => match message.from.family() {
                Some(Family::Consensus(topic)) => {
                    info!("📣 {} reporting decision {} on {}", self.system_id, value, topic);
                    self.to_hub(Payload::AppDecide { topic, value }, ctx);
                    Ok(())
                }
                _ => Err(ConsensusError::Unroutable(message.from)),
            },
            _ => Err(ConsensusError::unsupported(&self.id, &message)),
        }
    }
}

fn register_of(id: &AbstractionId) -> Result<String, ConsensusError> {
    id.register_key()
        .map(str::to_string)
        .ok_or_else(|| ConsensusError::Unroutable(id.clone()))
}

/// `app` with its private links.
pub fn app_subtree(membership: &Arc<Membership>) -> Vec<(AbstractionId, Box<dyn Abstraction>)> {
    let id = AbstractionId::app();
    let mut out = links_for(&id, membership, true);
    out.push((id, Box::new(App::new(membership.system_id.clone()))));
    out
}
