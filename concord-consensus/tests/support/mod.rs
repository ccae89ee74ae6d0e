//! In-memory cluster harness: N runs wired through an [`InMemoryNetwork`],
//! plus a hub endpoint that sends client requests and collects replies.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use concord_common::{AbstractionId, Endpoint, Message, Payload, ProcessId, Value};
use concord_consensus::{ConsensusConfig, Membership, System, SystemHandle};
use concord_p2p::{InMemoryNetwork, InMemoryTransport, Transport};
use tokio::sync::mpsc::Receiver;

pub const SYSTEM_ID: &str = "sys-test";
pub const HUB_PORT: u16 = 5000;

pub fn hub_endpoint() -> Endpoint {
    Endpoint::new("127.0.0.1", HUB_PORT)
}

/// Reply collected at the hub: the replying process's port and the payload.
pub type Reply = (u16, Payload);

pub struct Cluster {
    pub network: InMemoryNetwork,
    pub processes: Vec<ProcessId>,
    handles: Vec<SystemHandle>,
    hub: InMemoryTransport,
    hub_rx: Receiver<Message>,
}

impl Cluster {
    /// Starts `n` runs ranked 1..=n.
    pub fn start(n: u32, config: ConsensusConfig) -> Self {
        let network = InMemoryNetwork::new();
        let (hub, hub_rx) = network.join(hub_endpoint());

        let processes: Vec<ProcessId> = (1..=n)
            .map(|i| ProcessId::new("127.0.0.1", HUB_PORT + i as u16, "test", i, i))
            .collect();

        let mut handles = Vec::new();
        for p in &processes {
            let (transport, mut rx) = network.join(p.endpoint());
            let membership =
                Membership::locate(SYSTEM_ID, &p.owner, p.index, processes.clone(), hub_endpoint()).unwrap();
            let handle = System::new(membership, config.clone(), Arc::new(transport)).start();

            let inbox = handle.inbox();
            tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    if inbox.send(message).is_err() {
                        break;
                    }
                }
            });
            handles.push(handle);
        }

        Self {
            network,
            processes,
            handles,
            hub,
            hub_rx,
        }
    }

    pub fn process(&self, index: u32) -> &ProcessId {
        &self.processes[index as usize - 1]
    }

    /// Sends a client request from the hub to process `index`.
    pub async fn request(&self, index: u32, payload: Payload) {
        let hub = hub_endpoint();
        let request = Message::new(AbstractionId::hub(), AbstractionId::app(), payload);
        let frame = Message::new(
            AbstractionId::app().pl(),
            AbstractionId::app().pl(),
            Payload::NetworkMessage {
                sender_host: hub.host.clone(),
                sender_port: hub.port,
                message: Box::new(request),
            },
        )
        .with_system(SYSTEM_ID);

        self.hub.send_to(&self.process(index).endpoint(), frame).await.unwrap();
    }

    pub async fn write(&self, index: u32, register: &str, value: i64) {
        self.request(index, Payload::AppWrite { register: register.into(), value: Value::defined(value) })
            .await;
    }

    pub async fn read(&self, index: u32, register: &str) {
        self.request(index, Payload::AppRead { register: register.into() }).await;
    }

    pub async fn propose(&self, index: u32, topic: &str, value: i64) {
        self.request(index, Payload::AppPropose { topic: topic.into(), value: Value::defined(value) })
            .await;
    }

    /// Next reply at the hub, or `None` once `wait` elapses.
    pub async fn next_reply(&mut self, wait: Duration) -> Option<Reply> {
        let frame = tokio::time::timeout(wait, self.hub_rx.recv()).await.ok()??;
        match frame.payload {
            Payload::NetworkMessage { sender_port, message, .. } => Some((sender_port, message.payload)),
            other => panic!("hub got a non-network frame: {:?}", other),
        }
    }

    /// Collects replies until `count` match `keep` or `wait` elapses.
    pub async fn collect<F>(&mut self, count: usize, wait: Duration, keep: F) -> Vec<Reply>
    where
        F: Fn(&Payload) -> bool,
    {
        let deadline = tokio::time::Instant::now() + wait;
        let mut out = Vec::new();
        while out.len() < count {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            match self.next_reply(left).await {
                Some(reply) if keep(&reply.1) => out.push(reply),
                Some(_) => {}
                None => break,
            }
        }
        out
    }

    /// Makes process `index` unreachable in both directions.
    pub fn crash(&self, index: u32) {
        self.network.crash(&self.process(index).endpoint());
    }

    pub async fn shutdown(mut self) {
        for handle in &mut self.handles {
            handle.destroy().await;
        }
    }
}

pub fn port_of(index: u32) -> u16 {
    HUB_PORT + index as u16
}

pub fn is_decide(p: &Payload) -> bool {
    matches!(p, Payload::AppDecide { .. })
}

pub fn decided(p: &Payload) -> Option<Value> {
    match p {
        Payload::AppDecide { value, .. } => Some(*value),
        _ => None,
    }
}
