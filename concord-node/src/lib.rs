//! The concord process: hub registration, one run per system id, and the
//! plumbing between the TCP listener and those runs.

pub mod cli;
pub mod config;
pub mod node;
pub mod setup;

pub use config::Config;
pub use node::{Node, NodeIdentity};
