use concord_common::{AbstractionId, Message};
use concord_p2p::NetworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    /// No instance is registered under the id and no lazy rule covers it.
    #[error("No handler for {0}")]
    Unroutable(AbstractionId),

    #[error("{abstraction} does not support {kind}")]
    UnsupportedMessage {
        abstraction: AbstractionId,
        kind: &'static str,
    },

    #[error("No alive process left to elect")]
    NoLeaderCandidate,

    #[error("Message from unknown sender {host}:{port}")]
    UnknownSender { host: String, port: u16 },

    #[error("Process {owner}-{index} is not part of the run")]
    UnknownProcess { owner: String, index: u32 },

    #[error("Run {0} is closed")]
    Closed(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl ConsensusError {
    pub fn unsupported(abstraction: &AbstractionId, message: &Message) -> Self {
        ConsensusError::UnsupportedMessage {
            abstraction: abstraction.clone(),
            kind: message.kind(),
        }
    }
}

impl From<ConsensusError> for concord_common::ConcordError {
    fn from(e: ConsensusError) -> Self {
        concord_common::ConcordError::Consensus(e.to_string())
    }
}
