//! Fault-tolerant abstractions for crash-stop runs.
//!
//! Each run ([`System`]) owns one ordered event queue and one consumer task.
//! Abstraction instances live in the run's [`Registry`], addressed by typed
//! [`AbstractionId`](concord_common::AbstractionId)s, and only talk to each
//! other by emitting messages back into the queue.
//!
//! Stack, leaves first: perfect links and best-effort broadcast, the eventually
//! perfect failure detector (EPFD), the eventual leader detector (ELD), epoch
//! change (EC), epoch consensus (EP), uniform consensus (UC), and the N-N
//! atomic register (NNAR).

pub mod abstraction;
pub mod app;
pub mod config;
pub mod consensus;
pub mod detection;
pub mod error;
pub mod link;
pub mod membership;
pub mod register;
pub mod registry;
pub mod system;
pub mod timer;

pub use abstraction::{Abstraction, Context, EventQueue, Transmission};
pub use config::ConsensusConfig;
pub use error::ConsensusError;
pub use membership::Membership;
pub use registry::Registry;
pub use system::{System, SystemHandle};
