use std::sync::Arc;

use concord_common::{AbstractionId, Message, Payload};

use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::membership::Membership;

/// Point-to-point link.
///
/// Outbound: wraps the payload in a network message addressed to the peer's
/// instance of this same link; no destination means the hub. Inbound: resolves
/// the sender by listening endpoint and delivers to the parent.
pub struct PerfectLink {
    id: AbstractionId,
    parent: AbstractionId,
    membership: Arc<Membership>,
}

impl PerfectLink {
    pub fn new(id: AbstractionId, parent: AbstractionId, membership: Arc<Membership>) -> Self {
        Self { id, parent, membership }
    }
}

impl Abstraction for PerfectLink {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::NetworkMessage {
                sender_host,
                sender_port,
                message: inner,
            } => {
                let sender = self
                    .membership
                    .sender_at(&sender_host, sender_port)
                    .ok_or(ConsensusError::UnknownSender {
                        host: sender_host,
                        port: sender_port,
                    })?;

                ctx.emit(
                    Message::new(
                        self.id.clone(),
                        self.parent.clone(),
                        Payload::PlDeliver { sender, message: inner },
                    )
                    .with_system(message.system_id),
                );
                Ok(())
            }
            Payload::PlSend { destination, message: inner } => {
                let endpoint = destination
                    .map(|p| p.endpoint())
                    .unwrap_or_else(|| self.membership.hub.clone());
                let own = &self.membership.own;

                ctx.transmit(
                    endpoint,
                    Message::new(
                        self.id.clone(),
                        self.id.clone(),
                        Payload::NetworkMessage {
                            sender_host: own.host.clone(),
                            sender_port: own.port,
                            message: inner,
                        },
                    )
                    .with_system(self.membership.system_id.clone()),
                );
                Ok(())
            }
            _ => Err(ConsensusError::unsupported(&self.id, &message)),
        }
    }
}
