//! address
//!
//! Typed addressing of abstraction instances inside a run.
//!
//! An [`AbstractionId`] is the path from the root `app` abstraction down to one
//! instance, e.g. the point-to-point link of the broadcast used by register
//! `x` is `app.nnar[x].beb.pl`. Ids are only ever built from typed segments;
//! the dotted text form exists for logs and for the hub protocol.

pub mod errors;
mod id;

pub use id::{AbstractionId, Family, Segment};
