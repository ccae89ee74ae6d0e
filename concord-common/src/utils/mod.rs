//! utils.rs
//!
//! Process identities and endpoint helpers shared by every crate.

pub mod process;
pub use process::{max_rank, Endpoint, ProcessId};
