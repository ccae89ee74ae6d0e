//! The contract every abstraction instance implements, and the context its
//! handler runs in.

use concord_common::{AbstractionId, Endpoint, Message};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ConsensusError;

/// Sending half of a run's event queue.
pub type EventQueue = mpsc::UnboundedSender<Message>;

pub trait Abstraction: Send {
    /// Handles one message. Only ever called by the run's consumer task.
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError>;

    /// Releases timers. Called once when the run is torn down.
    fn destroy(&mut self) {}
}

/// Outbound frame produced by a link, sent after the handler returns.
#[derive(Debug, Clone)]
pub struct Transmission {
    pub destination: Endpoint,
    pub message: Message,
}

/// Effects of one handler invocation.
///
/// Emitted messages go straight to the tail of the run queue. Transmissions,
/// retirements and registrations are applied by the consumer once the handler
/// returns, retirements before registrations.
pub struct Context {
    queue: EventQueue,
    transmissions: Vec<Transmission>,
    registrations: Vec<(AbstractionId, Box<dyn Abstraction>)>,
    retirements: Vec<AbstractionId>,
}

impl Context {
    pub fn new(queue: EventQueue) -> Self {
        Self {
            queue,
            transmissions: Vec::new(),
            registrations: Vec::new(),
            retirements: Vec::new(),
        }
    }

    pub fn emit(&mut self, message: Message) {
        if let Err(e) = self.queue.send(message) {
            debug!("queue closed, dropping {}", e.0.kind());
        }
    }

    pub fn transmit(&mut self, destination: Endpoint, message: Message) {
        self.transmissions.push(Transmission { destination, message });
    }

    pub fn register(&mut self, id: AbstractionId, abstraction: Box<dyn Abstraction>) {
        self.registrations.push((id, abstraction));
    }

    /// Removes `root` and everything below it from the registry.
    pub fn retire(&mut self, root: AbstractionId) {
        self.retirements.push(root);
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn take_transmissions(&mut self) -> Vec<Transmission> {
        std::mem::take(&mut self.transmissions)
    }

    pub fn take_registrations(&mut self) -> Vec<(AbstractionId, Box<dyn Abstraction>)> {
        std::mem::take(&mut self.registrations)
    }

    pub fn take_retirements(&mut self) -> Vec<AbstractionId> {
        std::mem::take(&mut self.retirements)
    }
}
