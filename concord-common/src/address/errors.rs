use thiserror::Error;

/// Errors raised while parsing textual addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// One dot-separated component is not a known abstraction segment.
    #[error("Invalid abstraction segment: {0}")]
    InvalidSegment(String),

    #[error("Empty abstraction id")]
    Empty,

    /// Expected `host:port`.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
