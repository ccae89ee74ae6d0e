use concord_common::Endpoint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Failed to send message to {0}: {1}")]
    Send(Endpoint, String),

    #[error("Peer not found: {0}")]
    PeerNotFound(Endpoint),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<NetworkError> for concord_common::ConcordError {
    fn from(e: NetworkError) -> Self {
        concord_common::ConcordError::Network(e.to_string())
    }
}
