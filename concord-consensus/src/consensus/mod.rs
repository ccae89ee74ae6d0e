//! Consensus stack for one topic: uniform consensus over epoch change and
//! per-epoch read/write consensus.
//!
//! Layout of a topic subtree:
//!
//! ```text
//! app.uc[t]                    UniformConsensus
//! app.uc[t].ec                 EpochChange (+ .pl, .beb, .beb.pl)
//! app.uc[t].ec.eld             Eld
//! app.uc[t].ec.eld.epfd        Epfd (+ .pl)
//! app.uc[t].ep[ts]             EpochConsensus (+ .pl, .beb, .beb.pl)
//! ```

mod ec;
mod ep;
mod uc;

use std::sync::Arc;

use concord_common::AbstractionId;

pub use ec::EpochChange;
pub use ep::{EpState, EpochConsensus};
pub use uc::UniformConsensus;

use crate::abstraction::{Abstraction, EventQueue};
use crate::config::ConsensusConfig;
use crate::detection::{Eld, Epfd};
use crate::link::links_for;
use crate::membership::Membership;

/// Epoch consensus instance `ep[ets]` below `uc`, with its links.
pub fn epoch_subtree(
    uc: &AbstractionId,
    ets: u64,
    state: EpState,
    membership: &Arc<Membership>,
) -> Vec<(AbstractionId, Box<dyn Abstraction>)> {
    let id = uc.ep(ets);
    let mut out = links_for(&id, membership, true);
    out.push((
        id.clone(),
        Box::new(EpochConsensus::new(id, uc.clone(), membership.clone(), ets, state)),
    ));
    out
}

/// Everything a topic needs on first reference, including the initial epoch 0.
///
/// Starts the failure detector's timer, so it must run inside a tokio runtime.
pub fn consensus_subtree(
    topic: &str,
    membership: &Arc<Membership>,
    config: &ConsensusConfig,
    queue: &EventQueue,
) -> Vec<(AbstractionId, Box<dyn Abstraction>)> {
    let uc = AbstractionId::consensus(topic);
    let ec = uc.ec();
    let eld = ec.eld();
    let epfd = eld.epfd();

    let mut out: Vec<(AbstractionId, Box<dyn Abstraction>)> = vec![
        (uc.clone(), Box::new(UniformConsensus::new(topic, membership.clone()))),
        (ec.clone(), Box::new(EpochChange::new(ec.clone(), uc.clone(), membership.clone()))),
        (eld.clone(), Box::new(Eld::new(eld.clone(), ec.clone(), membership.clone()))),
        (
            epfd.clone(),
            Box::new(Epfd::new(
                epfd.clone(),
                eld.clone(),
                membership.clone(),
                config.epfd_delta,
                queue.clone(),
            )),
        ),
    ];
    out.extend(links_for(&ec, membership, true));
    out.extend(links_for(&epfd, membership, false));
    out.extend(epoch_subtree(&uc, 0, EpState::default(), membership));
    out
}

#[cfg(test)]
mod tests {
    use concord_common::{Message, Payload, ProcessId, Value};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::abstraction::testing::{context, drain, membership, process};
    use crate::abstraction::Context;

    fn uc_id() -> AbstractionId {
        AbstractionId::consensus("t")
    }

    fn sent(m: &Message) -> (Option<ProcessId>, Message) {
        match &m.payload {
            Payload::PlSend { destination, message } => (destination.clone(), (**message).clone()),
            other => panic!("expected a PL send, got {:?}", other),
        }
    }

    fn broadcast(m: &Message) -> Message {
        match &m.payload {
            Payload::BebBroadcast { message } => (**message).clone(),
            other => panic!("expected a broadcast, got {:?}", other),
        }
    }

    fn via_pl(from: u32, to: &AbstractionId, inner: Message) -> Message {
        Message::new(to.pl(), to.clone(), Payload::PlDeliver { sender: process(from), message: Box::new(inner) })
    }

    fn via_beb(from: u32, to: &AbstractionId, inner: Message) -> Message {
        Message::new(to.beb(), to.clone(), Payload::BebDeliver { sender: process(from), message: Box::new(inner) })
    }

    /// Moves `uc` from epoch 0 to epoch 5 led by process 2 and returns the new instance.
    fn hand_over(
        uc: &mut UniformConsensus,
        old: &mut EpochConsensus,
        ctx: &mut Context,
        rx: &mut UnboundedReceiver<Message>,
    ) -> Box<dyn Abstraction> {
        let start = Payload::EcStartEpoch { new_timestamp: 5, new_leader: process(2) };
        uc.handle(Message::new(uc_id().ec(), uc_id(), start), ctx).unwrap();
        let abort = drain(rx).into_iter().find(|m| m.payload == Payload::EpAbort).expect("abort");
        old.handle(abort, ctx).unwrap();
        for aborted in drain(rx) {
            uc.handle(aborted, ctx).unwrap();
        }
        assert_eq!(ctx.take_retirements(), vec![uc_id().ep(0)]);
        ctx.take_registrations()
            .into_iter()
            .find_map(|(id, instance)| (id == uc_id().ep(5)).then_some(instance))
            .expect("ep[5] registered")
    }

    #[test]
    fn test_value_accepted_before_abort_is_decided_by_next_leader() {
        let (ep0, ep5) = (uc_id().ep(0), uc_id().ep(5));

        // Process 1 accepted 9 from the epoch 0 leader (3); process 2 missed the write.
        let m1 = membership(3, 1);
        let (mut ctx1, mut rx1) = context();
        let mut uc1 = UniformConsensus::new("t", m1.clone());
        let mut old1 = EpochConsensus::new(ep0.clone(), uc_id(), m1, 0, EpState::default());
        let write = Message::new(ep0.clone(), ep0.clone(), Payload::EpInternalWrite { value: Value::defined(9) });
        old1.handle(via_beb(3, &ep0, write), &mut ctx1).unwrap();
        drain(&mut rx1);

        let m2 = membership(3, 2);
        let (mut ctx2, mut rx2) = context();
        let mut uc2 = UniformConsensus::new("t", m2.clone());
        let mut old2 = EpochConsensus::new(ep0.clone(), uc_id(), m2, 0, EpState::default());
        let propose = Payload::UcPropose { value: Value::defined(7) };
        uc2.handle(Message::new(AbstractionId::app(), uc_id(), propose), &mut ctx2).unwrap();
        assert!(drain(&mut rx2).is_empty(), "process 2 does not lead epoch 0");

        // Leader 3 went silent before deciding; both move to epoch 5.
        let mut new1 = hand_over(&mut uc1, &mut old1, &mut ctx1, &mut rx1);
        let mut new2 = hand_over(&mut uc2, &mut old2, &mut ctx2, &mut rx2);

        let propose = drain(&mut rx2).pop().expect("new leader proposes");
        assert_eq!(propose.to, ep5);
        new2.handle(propose, &mut ctx2).unwrap();

        let read = broadcast(&drain(&mut rx2)[0]);
        new1.handle(via_beb(2, &ep5, read.clone()), &mut ctx1).unwrap();
        new2.handle(via_beb(2, &ep5, read), &mut ctx2).unwrap();
        let (to, state1) = sent(&drain(&mut rx1)[0]);
        assert_eq!(to, Some(process(2)));
        assert_eq!(state1.payload, Payload::EpInternalState { value_timestamp: 0, value: Value::defined(9) });
        let (_, state2) = sent(&drain(&mut rx2)[0]);

        new2.handle(via_pl(1, &ep5, state1), &mut ctx2).unwrap();
        new2.handle(via_pl(2, &ep5, state2), &mut ctx2).unwrap();
        let write = broadcast(&drain(&mut rx2)[0]);
        assert_eq!(write.payload, Payload::EpInternalWrite { value: Value::defined(9) });

        new1.handle(via_beb(2, &ep5, write.clone()), &mut ctx1).unwrap();
        new2.handle(via_beb(2, &ep5, write), &mut ctx2).unwrap();
        let (_, accept1) = sent(&drain(&mut rx1)[0]);
        let (_, accept2) = sent(&drain(&mut rx2)[0]);
        new2.handle(via_pl(1, &ep5, accept1), &mut ctx2).unwrap();
        new2.handle(via_pl(2, &ep5, accept2), &mut ctx2).unwrap();

        let decided = broadcast(&drain(&mut rx2)[0]);
        new2.handle(via_beb(2, &ep5, decided), &mut ctx2).unwrap();
        for m in drain(&mut rx2) {
            uc2.handle(m, &mut ctx2).unwrap();
        }
        assert_eq!(drain(&mut rx2)[0].payload, Payload::UcDecide { value: Value::defined(9) });
    }

    #[tokio::test]
    async fn test_consensus_subtree_layout() {
        let (ctx, _rx) = context();
        let config = ConsensusConfig::default();
        let ids: Vec<String> = consensus_subtree("t", &membership(3, 1), &config, ctx.queue())
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();

        for expected in [
            "app.uc[t]",
            "app.uc[t].ec",
            "app.uc[t].ec.pl",
            "app.uc[t].ec.beb",
            "app.uc[t].ec.beb.pl",
            "app.uc[t].ec.eld",
            "app.uc[t].ec.eld.epfd",
            "app.uc[t].ec.eld.epfd.pl",
            "app.uc[t].ep[0]",
            "app.uc[t].ep[0].pl",
            "app.uc[t].ep[0].beb",
            "app.uc[t].ep[0].beb.pl",
        ] {
            assert!(ids.contains(&expected.to_string()), "missing {}", expected);
        }
        assert_eq!(ids.len(), 12);
    }
}
