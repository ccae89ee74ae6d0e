//! Transport primitives scoped to one parent abstraction.
//!
//! Every abstraction that talks to its peers gets a private perfect link
//! (`<parent>.pl`) and, when it broadcasts, a best-effort broadcast
//! (`<parent>.beb`) with its own link (`<parent>.beb.pl`).

mod beb;
mod pl;

use std::sync::Arc;

use concord_common::AbstractionId;

pub use beb::BestEffortBroadcast;
pub use pl::PerfectLink;

use crate::abstraction::Abstraction;
use crate::membership::Membership;

/// Link instances serving `parent`.
pub fn links_for(
    parent: &AbstractionId,
    membership: &Arc<Membership>,
    with_broadcast: bool,
) -> Vec<(AbstractionId, Box<dyn Abstraction>)> {
    let mut out: Vec<(AbstractionId, Box<dyn Abstraction>)> = vec![(
        parent.pl(),
        Box::new(PerfectLink::new(parent.pl(), parent.clone(), membership.clone())),
    )];

    if with_broadcast {
        let beb = parent.beb();
        out.push((
            beb.clone(),
            Box::new(BestEffortBroadcast::new(beb.clone(), membership.clone())),
        ));
        out.push((
            beb.pl(),
            Box::new(PerfectLink::new(beb.pl(), beb, membership.clone())),
        ));
    }

    out
}
