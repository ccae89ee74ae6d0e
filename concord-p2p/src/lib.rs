//! Transport collaborators for concord runs.
//!
//! The consensus core only needs "send this message to that endpoint" and a
//! stream of inbound messages. Two implementations are provided: a TCP
//! transport speaking length-prefixed bincode frames, and an in-memory
//! switchboard used by tests to wire several processes together and to
//! simulate crashes.

pub mod codec;
pub mod error;
pub mod in_memory;
pub mod tcp;
pub mod traits;

pub use error::NetworkError;
pub use in_memory::{InMemoryNetwork, InMemoryTransport};
pub use tcp::{TcpListenerHandle, TcpTransport};
pub use traits::Transport;
