//! Shared data model for the concord workspace.
//!
//! Everything that crosses a crate boundary lives here: process identities,
//! register/consensus values, typed abstraction addresses and the message
//! envelope exchanged between abstractions and over the wire.

pub mod address;
pub mod error;
pub mod message;
pub mod utils;
pub mod value;

pub use address::{AbstractionId, Family, Segment};
pub use error::{ConcordError, Result};
pub use message::{Message, Payload};
pub use utils::{Endpoint, ProcessId};
pub use value::Value;
