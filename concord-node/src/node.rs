use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use concord_common::{AbstractionId, ConcordError, Endpoint, Message, Payload, ProcessId};
use concord_consensus::{ConsensusConfig, Membership, System, SystemHandle};
use concord_p2p::Transport;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Who this process is and where it listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub owner: String,
    pub index: u32,
    pub host: String,
    pub port: u16,
}

/// Inventory of runs hosted by this process, keyed by system id.
pub struct Node {
    identity: NodeIdentity,
    hub: Endpoint,
    transport: Arc<dyn Transport>,
    consensus: ConsensusConfig,
    systems: HashMap<String, SystemHandle>,
}

impl Node {
    pub fn new(
        identity: NodeIdentity,
        hub: Endpoint,
        transport: Arc<dyn Transport>,
        consensus: ConsensusConfig,
    ) -> Self {
        Self {
            identity,
            hub,
            transport,
            consensus,
            systems: HashMap::new(),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn is_running(&self, system_id: &str) -> bool {
        self.systems.get(system_id).is_some_and(|h| h.is_running())
    }

    pub fn system_ids(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }

    /// Announces this process to the hub.
    pub async fn register(&self) -> Result<(), ConcordError> {
        let registration = Message::new(
            AbstractionId::app(),
            AbstractionId::hub(),
            Payload::ProcRegistration {
                owner: self.identity.owner.clone(),
                index: self.identity.index,
            },
        );
        let frame = Message::new(
            AbstractionId::app(),
            AbstractionId::hub(),
            Payload::NetworkMessage {
                sender_host: self.identity.host.clone(),
                sender_port: self.identity.port,
                message: Box::new(registration),
            },
        );

        self.transport.send_to(&self.hub, frame).await?;
        info!(
            "📝 Registered {}-{} with hub {}",
            self.identity.owner, self.identity.index, self.hub
        );
        Ok(())
    }

    /// Routes one inbound frame: run control to the inventory, everything
    /// else to the run named by its system id.
    pub async fn handle(&mut self, frame: Message) {
        let control = match frame.payload.network_inner().map(|m| &m.payload) {
            Some(Payload::ProcInitializeSystem { processes }) => Some(Some(processes.clone())),
            Some(Payload::ProcDestroySystem) => Some(None),
            _ => None,
        };

        match control {
            Some(Some(processes)) => {
                if let Err(e) = self.init(&frame.system_id, processes).await {
                    warn!("cannot start system {}: {}", frame.system_id, e);
                }
            }
            Some(None) => self.destroy(&frame.system_id).await,
            None => self.forward(frame),
        }
    }

    async fn init(&mut self, system_id: &str, processes: Vec<ProcessId>) -> Result<(), ConcordError> {
        if self.systems.contains_key(system_id) {
            warn!("system {} already running, restarting it", system_id);
            self.destroy(system_id).await;
        }

        let membership = Membership::locate(
            system_id,
            &self.identity.owner,
            self.identity.index,
            processes,
            self.hub.clone(),
        )?;
        let handle = System::new(membership, self.consensus.clone(), self.transport.clone()).start();
        self.systems.insert(system_id.to_string(), handle);
        Ok(())
    }

    async fn destroy(&mut self, system_id: &str) {
        match self.systems.remove(system_id) {
            Some(mut handle) => {
                handle.destroy().await;
                info!("🗑️ System {} removed", handle.system_id());
            }
            None => debug!("destroy for unknown system {}", system_id),
        }
    }

    fn forward(&self, frame: Message) {
        let Some(handle) = self.systems.get(&frame.system_id) else {
            warn!("dropping {} for unknown system '{}'", frame.kind(), frame.system_id);
            return;
        };
        if let Err(e) = handle.deliver(frame) {
            warn!("{}", e);
        }
    }

    /// Serves `inbound` until it closes or `shutdown` resolves, then tears
    /// every run down.
    pub async fn run<F>(mut self, mut inbound: mpsc::Receiver<Message>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                next = inbound.recv() => match next {
                    Some(frame) => self.handle(frame).await,
                    None => break,
                },
            }
        }
        self.shutdown().await;
    }

    pub async fn shutdown(&mut self) {
        let handles: Vec<SystemHandle> = self.systems.drain().map(|(_, h)| h).collect();
        futures::future::join_all(handles.into_iter().map(|mut h| async move { h.destroy().await })).await;
        info!("🛑 Node {}-{} stopped", self.identity.owner, self.identity.index);
    }
}
