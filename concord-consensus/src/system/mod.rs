//! One run of the abstraction stack.
//!
//! A [`System`] owns the registry, the run's single event queue and the
//! transport. [`System::start`] moves it onto its own consumer task and hands
//! back a [`SystemHandle`] for feeding inbound messages and tearing it down.

mod dispatch;
mod parked;

use std::collections::HashMap;
use std::sync::Arc;

use concord_common::{AbstractionId, Message};
use concord_p2p::Transport;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::abstraction::EventQueue;
use crate::app::app_subtree;
use crate::config::ConsensusConfig;
use crate::error::ConsensusError;
use crate::membership::Membership;
use crate::registry::Registry;

use parked::Parked;

pub struct System {
    membership: Arc<Membership>,
    config: ConsensusConfig,
    registry: Registry,
    parked: Parked,
    /// Highest retired epoch per consensus root.
    retired: HashMap<AbstractionId, u64>,
    queue: EventQueue,
    rx: mpsc::UnboundedReceiver<Message>,
    transport: Arc<dyn Transport>,
}

impl System {
    pub fn new(membership: Membership, config: ConsensusConfig, transport: Arc<dyn Transport>) -> Self {
        let membership = Arc::new(membership);
        let (queue, rx) = mpsc::unbounded_channel();

        let mut registry = Registry::new();
        registry.register_all(app_subtree(&membership));

        Self {
            parked: Parked::new(config.max_parked),
            retired: HashMap::new(),
            membership,
            config,
            registry,
            queue,
            rx,
            transport,
        }
    }

    /// Spawns the consumer task. Must be called inside a tokio runtime.
    pub fn start(self) -> SystemHandle {
        let system_id = self.membership.system_id.clone();
        let queue = self.queue.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(
            "🚀 Starting system {} as {} ({} processes)",
            system_id,
            self.membership.own,
            self.membership.n()
        );
        let task = tokio::spawn(self.run(shutdown_rx));

        SystemHandle {
            system_id,
            queue,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                next = self.rx.recv() => match next {
                    Some(message) => self.dispatch(message).await,
                    None => break,
                },
            }
        }
        self.destroy();
    }

    fn destroy(&mut self) {
        self.registry.destroy_all();
        self.rx.close();
        info!("🛑 System {} destroyed", self.membership.system_id);
    }
}

/// Owner's side of a running [`System`].
pub struct SystemHandle {
    system_id: String,
    queue: EventQueue,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SystemHandle {
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// Appends an inbound message to the run's queue.
    pub fn deliver(&self, message: Message) -> Result<(), ConsensusError> {
        self.queue
            .send(message)
            .map_err(|_| ConsensusError::Closed(self.system_id.clone()))
    }

    /// Sender feeding the run's queue, for inbound pumps.
    pub fn inbox(&self) -> EventQueue {
        self.queue.clone()
    }

    /// Stops the consumer, cancels timers and drops every instance.
    pub async fn destroy(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("system {} consumer ended abnormally: {}", self.system_id, e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SystemHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
