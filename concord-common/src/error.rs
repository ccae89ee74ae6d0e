use thiserror::Error;

use crate::address::errors::AddressError;

#[derive(Debug, Error)]
pub enum ConcordError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Consensus error: {0}")]
    Consensus(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConcordError>;
