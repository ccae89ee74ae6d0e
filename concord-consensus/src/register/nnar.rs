use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use concord_common::{AbstractionId, Message, Payload, ProcessId, Value};
use tracing::debug;

use crate::abstraction::{Abstraction, Context};
use crate::error::ConsensusError;
use crate::membership::Membership;

/// Local copy of the register, ordered by `(timestamp, writer_rank)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Stamped {
    timestamp: u64,
    writer_rank: u32,
    value: Value,
}

impl Stamped {
    fn order(&self) -> (u64, u32) {
        (self.timestamp, self.writer_rank)
    }
}

/// N-N atomic register (read-impose write-majority).
///
/// Reads and writes both run a query phase against a majority followed by a
/// write phase; a read writes back the freshest value it saw before
/// returning it.
pub struct Nnar {
    id: AbstractionId,
    key: String,
    membership: Arc<Membership>,
    local: Stamped,
    read_id: u64,
    replies: HashMap<ProcessId, Stamped>,
    acks: HashSet<ProcessId>,
    reading: bool,
    write_val: Value,
    read_val: Value,
}

impl Nnar {
    pub fn new(key: &str, membership: Arc<Membership>) -> Self {
        Self {
            id: AbstractionId::register(key),
            key: key.to_string(),
            membership,
            local: Stamped::default(),
            read_id: 0,
            replies: HashMap::new(),
            acks: HashSet::new(),
            reading: false,
            write_val: Value::UNDEFINED,
            read_val: Value::UNDEFINED,
        }
    }

    pub fn value(&self) -> Value {
        self.local.value
    }

    pub fn read_id(&self) -> u64 {
        self.read_id
    }

    fn start_round(&mut self, reading: bool, ctx: &mut Context) {
        self.read_id += 1;
        self.replies.clear();
        self.acks.clear();
        self.reading = reading;
        debug!("{} round {} ({})", self.id, self.read_id, if reading { "read" } else { "write" });
        self.broadcast(Payload::NnarInternalRead { read_id: self.read_id }, ctx);
    }

    fn broadcast(&self, payload: Payload, ctx: &mut Context) {
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.beb(),
            Payload::BebBroadcast {
                message: Box::new(Message::new(self.id.clone(), self.id.clone(), payload)),
            },
        ));
    }

    fn reply(&self, to: ProcessId, payload: Payload, ctx: &mut Context) {
        ctx.emit(Message::new(
            self.id.clone(),
            self.id.pl(),
            Payload::PlSend {
                destination: Some(to),
                message: Box::new(Message::new(self.id.clone(), self.id.clone(), payload)),
            },
        ));
    }

    fn on_read(&mut self, sender: ProcessId, read_id: u64, ctx: &mut Context) {
        if self.read_id == 0 {
            self.read_id = read_id;
        }
        self.reply(
            sender,
            Payload::NnarInternalValue {
                read_id,
                timestamp: self.local.timestamp,
                writer_rank: self.local.writer_rank,
                value: self.local.value,
            },
            ctx,
        );
    }

    fn on_value(&mut self, sender: ProcessId, read_id: u64, reply: Stamped, ctx: &mut Context) {
        if read_id != self.read_id {
            return;
        }

        self.replies.insert(sender, reply);
        if !self.membership.is_quorum(self.replies.len()) {
            return;
        }

        let Some(highest) = self.replies.values().copied().max_by_key(Stamped::order) else {
            return;
        };
        self.replies.clear();

        let imposed = if self.reading {
            self.read_val = highest.value;
            highest
        } else {
            Stamped {
                timestamp: highest.timestamp + 1,
                writer_rank: self.membership.own.rank,
                value: self.write_val,
            }
        };

        self.broadcast(
            Payload::NnarInternalWrite {
                read_id,
                timestamp: imposed.timestamp,
                writer_rank: imposed.writer_rank,
                value: imposed.value,
            },
            ctx,
        );
    }

    fn on_write(&mut self, sender: ProcessId, read_id: u64, incoming: Stamped, ctx: &mut Context) {
        if incoming.order() > self.local.order() {
            self.local = incoming;
        }
        self.reply(sender, Payload::NnarInternalAck { read_id }, ctx);
    }

    fn on_ack(&mut self, sender: ProcessId, read_id: u64, ctx: &mut Context) {
        if read_id != self.read_id {
            return;
        }

        self.acks.insert(sender);
        if !self.membership.is_quorum(self.acks.len()) {
            return;
        }
        self.acks.clear();

        let payload = if self.reading {
            tracing::info!(target: "consensus", "EVENT:READ_RETURN system={} register={} value={}", self.membership.system_id, self.key, self.read_val);
            Payload::NnarReadReturn { value: self.read_val }
        } else {
            tracing::info!(target: "consensus", "EVENT:WRITE_RETURN system={} register={} value={}", self.membership.system_id, self.key, self.write_val);
            Payload::NnarWriteReturn
        };
        ctx.emit(Message::new(self.id.clone(), AbstractionId::app(), payload));
    }
}

impl Abstraction for Nnar {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::NnarWrite { value } => {
                self.write_val = value;
                self.start_round(false, ctx);
            }
            Payload::NnarRead => self.start_round(true, ctx),
            Payload::BebDeliver { sender, message: inner } => match inner.payload {
                Payload::NnarInternalRead { read_id } => self.on_read(sender, read_id, ctx),
                Payload::NnarInternalWrite { read_id, timestamp, writer_rank, value } => {
                    self.on_write(sender, read_id, Stamped { timestamp, writer_rank, value }, ctx)
                }
                _ => return Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            Payload::PlDeliver { sender, message: inner } => match inner.payload {
                Payload::NnarInternalValue { read_id, timestamp, writer_rank, value } => {
                    self.on_value(sender, read_id, Stamped { timestamp, writer_rank, value }, ctx)
                }
                Payload::NnarInternalAck { read_id } => self.on_ack(sender, read_id, ctx),
                _ => return Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            _ => return Err(ConsensusError::unsupported(&self.id, &message)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstraction::testing::{context, drain, membership, process};

    fn id() -> AbstractionId {
        AbstractionId::register("x")
    }

    fn build(own: u32) -> Nnar {
        Nnar::new("x", membership(3, own))
    }

    fn inner(p: Payload) -> Box<Message> {
        Box::new(Message::new(id(), id(), p))
    }

    fn pl(from: u32, p: Payload) -> Message {
        Message::new(id().pl(), id(), Payload::PlDeliver { sender: process(from), message: inner(p) })
    }

    fn beb(from: u32, p: Payload) -> Message {
        Message::new(id().beb(), id(), Payload::BebDeliver { sender: process(from), message: inner(p) })
    }

    fn value(rid: u64, ts: u64, rank: u32, v: Option<i64>) -> Payload {
        Payload::NnarInternalValue { read_id: rid, timestamp: ts, writer_rank: rank, value: Value::from(v) }
    }

    fn broadcast_payload(m: &Message) -> Payload {
        match &m.payload {
            Payload::BebBroadcast { message } => message.payload.clone(),
            other => panic!("expected broadcast, got {:?}", other),
        }
    }

    #[test]
    fn test_write_imposes_fresh_timestamp() {
        let mut reg = build(2);
        let (mut ctx, mut rx) = context();

        reg.handle(Message::new(AbstractionId::app(), id(), Payload::NnarWrite { value: Value::defined(42) }), &mut ctx)
            .unwrap();
        assert_eq!(broadcast_payload(&drain(&mut rx)[0]), Payload::NnarInternalRead { read_id: 1 });

        reg.handle(pl(1, value(1, 4, 3, Some(1))), &mut ctx).unwrap();
        reg.handle(pl(1, value(1, 4, 3, Some(1))), &mut ctx).unwrap();
        assert!(drain(&mut rx).is_empty(), "one reply per replica");

        reg.handle(pl(3, value(1, 2, 1, None)), &mut ctx).unwrap();
        assert_eq!(
            broadcast_payload(&drain(&mut rx)[0]),
            Payload::NnarInternalWrite { read_id: 1, timestamp: 5, writer_rank: 2, value: Value::defined(42) }
        );

        reg.handle(pl(1, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        reg.handle(pl(2, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        let out = drain(&mut rx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, AbstractionId::app());
        assert_eq!(out[0].payload, Payload::NnarWriteReturn);

        reg.handle(pl(3, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        assert!(drain(&mut rx).is_empty(), "returns exactly once");
    }

    #[test]
    fn test_read_writes_back_and_returns_selected_value() {
        let mut reg = build(1);
        let (mut ctx, mut rx) = context();

        reg.handle(Message::new(AbstractionId::app(), id(), Payload::NnarRead), &mut ctx).unwrap();
        drain(&mut rx);

        reg.handle(pl(2, value(1, 3, 2, Some(9))), &mut ctx).unwrap();
        reg.handle(pl(3, value(1, 3, 3, Some(10))), &mut ctx).unwrap();
        assert_eq!(
            broadcast_payload(&drain(&mut rx)[0]),
            Payload::NnarInternalWrite { read_id: 1, timestamp: 3, writer_rank: 3, value: Value::defined(10) }
        );

        reg.handle(pl(2, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        reg.handle(pl(3, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        assert_eq!(drain(&mut rx)[0].payload, Payload::NnarReadReturn { value: Value::defined(10) });
    }

    #[test]
    fn test_read_of_empty_register_is_undefined() {
        let mut reg = build(1);
        let (mut ctx, mut rx) = context();

        reg.handle(Message::new(AbstractionId::app(), id(), Payload::NnarRead), &mut ctx).unwrap();
        reg.handle(pl(1, value(1, 0, 0, None)), &mut ctx).unwrap();
        reg.handle(pl(2, value(1, 0, 0, None)), &mut ctx).unwrap();
        reg.handle(pl(1, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        reg.handle(pl(2, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();

        let out = drain(&mut rx);
        assert_eq!(out.last().map(|m| m.payload.clone()), Some(Payload::NnarReadReturn { value: Value::UNDEFINED }));
    }

    #[test]
    fn test_stale_round_replies_are_ignored() {
        let mut reg = build(1);
        let (mut ctx, mut rx) = context();

        reg.handle(Message::new(AbstractionId::app(), id(), Payload::NnarRead), &mut ctx).unwrap();
        reg.handle(Message::new(AbstractionId::app(), id(), Payload::NnarRead), &mut ctx).unwrap();
        drain(&mut rx);

        reg.handle(pl(2, value(1, 0, 0, None)), &mut ctx).unwrap();
        reg.handle(pl(3, value(1, 0, 0, None)), &mut ctx).unwrap();
        reg.handle(pl(2, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        reg.handle(pl(3, Payload::NnarInternalAck { read_id: 1 }), &mut ctx).unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_replica_adopts_only_larger_stamps() {
        let mut reg = build(1);
        let (mut ctx, mut rx) = context();

        let write = |ts, rank, v| Payload::NnarInternalWrite { read_id: 7, timestamp: ts, writer_rank: rank, value: Value::defined(v) };

        reg.handle(beb(2, write(2, 2, 20)), &mut ctx).unwrap();
        assert_eq!(reg.value(), Value::defined(20));

        reg.handle(beb(3, write(2, 1, 21)), &mut ctx).unwrap();
        assert_eq!(reg.value(), Value::defined(20), "lower rank on equal timestamp loses");

        reg.handle(beb(3, write(2, 3, 23)), &mut ctx).unwrap();
        assert_eq!(reg.value(), Value::defined(23));

        let acks: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|m| match m.payload {
                Payload::PlSend { message, .. } => Some(message.payload),
                _ => None,
            })
            .collect();
        assert_eq!(acks, vec![Payload::NnarInternalAck { read_id: 7 }; 3]);
    }

    #[test]
    fn test_idle_replica_catches_up_on_read_id() {
        let mut reg = build(3);
        let (mut ctx, mut rx) = context();

        reg.handle(beb(1, Payload::NnarInternalRead { read_id: 4 }), &mut ctx).unwrap();
        assert_eq!(reg.read_id(), 4);
        match &drain(&mut rx)[0].payload {
            Payload::PlSend { destination, message } => {
                assert_eq!(destination.as_ref(), Some(&process(1)));
                assert_eq!(message.payload, value(4, 0, 0, None));
            }
            other => panic!("unexpected {:?}", other),
        }

        reg.handle(beb(2, Payload::NnarInternalRead { read_id: 9 }), &mut ctx).unwrap();
        assert_eq!(reg.read_id(), 4);
    }
}
