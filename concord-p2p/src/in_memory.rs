use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use concord_common::{Endpoint, Message};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::trace;

use crate::error::NetworkError;
use crate::traits::Transport;

const INBOUND_CAPACITY: usize = 4096;

#[derive(Default)]
struct Switchboard {
    peers: HashMap<Endpoint, Sender<Message>>,
    crashed: HashSet<Endpoint>,
}

/// Shared switchboard connecting every endpoint that joined it.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    inner: Arc<Mutex<Switchboard>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn board(&self) -> MutexGuard<'_, Switchboard> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `endpoint` and returns its transport plus its inbound queue.
    pub fn join(&self, endpoint: Endpoint) -> (InMemoryTransport, Receiver<Message>) {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        self.board().peers.insert(endpoint.clone(), tx);

        (
            InMemoryTransport {
                local: endpoint,
                network: self.clone(),
            },
            rx,
        )
    }

    /// Every message from or to `endpoint` is silently lost from now on.
    pub fn crash(&self, endpoint: &Endpoint) {
        self.board().crashed.insert(endpoint.clone());
    }

    pub fn recover(&self, endpoint: &Endpoint) {
        self.board().crashed.remove(endpoint);
    }

    pub fn is_crashed(&self, endpoint: &Endpoint) -> bool {
        self.board().crashed.contains(endpoint)
    }
}

#[derive(Clone)]
pub struct InMemoryTransport {
    local: Endpoint,
    network: InMemoryNetwork,
}

impl InMemoryTransport {
    pub fn local(&self) -> &Endpoint {
        &self.local
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send_to(&self, destination: &Endpoint, message: Message) -> Result<(), NetworkError> {
        let sender = {
            let board = self.network.board();
            if board.crashed.contains(&self.local) || board.crashed.contains(destination) {
                trace!("dropping {} from {} to {}", message.kind(), self.local, destination);
                return Ok(());
            }
            board.peers.get(destination).cloned()
        };

        match sender {
            Some(sender) => sender
                .send(message)
                .await
                .map_err(|_| NetworkError::Send(destination.clone(), "receiver closed".into())),
            None => Err(NetworkError::PeerNotFound(destination.clone())),
        }
    }
}
