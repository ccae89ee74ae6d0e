//! Atomic registers, one N-N atomic register per key.

mod nnar;

use std::sync::Arc;

use concord_common::AbstractionId;

pub use nnar::Nnar;

use crate::abstraction::Abstraction;
use crate::link::links_for;
use crate::membership::Membership;

/// `app.nnar[key]` with its private links.
pub fn register_subtree(
    key: &str,
    membership: &Arc<Membership>,
) -> Vec<(AbstractionId, Box<dyn Abstraction>)> {
    let id = AbstractionId::register(key);
    let mut out = links_for(&id, membership, true);
    out.push((id, Box::new(Nnar::new(key, membership.clone()))));
    out
}
