use std::net::SocketAddr;

use async_trait::async_trait;
use concord_common::{Endpoint, Message};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::codec::{read_frame, write_frame};
use crate::error::NetworkError;
use crate::traits::Transport;

/// Opens one connection per message, writes a single frame and closes it.
#[derive(Clone, Debug, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_to(&self, destination: &Endpoint, message: Message) -> Result<(), NetworkError> {
        let mut stream = TcpStream::connect((destination.host.as_str(), destination.port))
            .await
            .map_err(|e| NetworkError::Send(destination.clone(), e.to_string()))?;

        write_frame(&mut stream, &message).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

/// Accept loop forwarding every decoded frame to `inbound`.
pub struct TcpListenerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TcpListenerHandle {
    pub async fn bind(addr: &str, inbound: mpsc::Sender<Message>) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let task = tokio::spawn(async move {
            loop {
                let (mut stream, peer) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("accept failed: {}", e);
                        continue;
                    }
                };

                let inbound = inbound.clone();
                tokio::spawn(async move {
                    // A peer may pipeline several frames before closing.
                    loop {
                        match read_frame(&mut stream).await {
                            Ok(message) => {
                                if inbound.send(message).await.is_err() {
                                    return;
                                }
                            }
                            Err(NetworkError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                                return;
                            }
                            Err(e) => {
                                warn!("failed to read frame from {}: {}", peer, e);
                                return;
                            }
                        }
                    }
                });
                debug!("connection from {}", peer);
            }
        });

        Ok(Self { local_addr, task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for TcpListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
