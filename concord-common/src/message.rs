//! message.rs
//!
//! The envelope every abstraction consumes and emits.
//!
//! A [`Message`] carries its routing fields (`from`, `to`, `system_id`) and
//! exactly one [`Payload`]. Transport payloads (`PlSend`, `BebDeliver`, ...)
//! wrap an inner message that is addressed to the peer instance of the
//! abstraction that produced it.

use serde::{Deserialize, Serialize};

use crate::address::AbstractionId;
use crate::utils::ProcessId;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub system_id: String,
    pub from: AbstractionId,
    pub to: AbstractionId,
    pub payload: Payload,
}

impl Message {
    pub fn new(from: AbstractionId, to: AbstractionId, payload: Payload) -> Self {
        Self {
            system_id: String::new(),
            from,
            to,
            payload,
        }
    }

    pub fn with_system(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = system_id.into();
        self
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    // Transport
    NetworkMessage { sender_host: String, sender_port: u16, message: Box<Message> },
    PlSend { destination: Option<ProcessId>, message: Box<Message> },
    PlDeliver { sender: ProcessId, message: Box<Message> },
    BebBroadcast { message: Box<Message> },
    BebDeliver { sender: ProcessId, message: Box<Message> },

    // Failure and leader detection
    EpfdTimeout,
    EpfdHeartbeatRequest,
    EpfdHeartbeatReply,
    EpfdSuspect { process: ProcessId },
    EpfdRestore { process: ProcessId },
    EldTrust { process: ProcessId },

    // Epoch change
    EcInternalNewEpoch { timestamp: u64 },
    EcInternalNack,
    EcStartEpoch { new_timestamp: u64, new_leader: ProcessId },

    // Epoch consensus
    EpPropose { value: Value },
    EpAbort,
    EpAborted { ets: u64, value_timestamp: u64, value: Value },
    EpDecide { ets: u64, value: Value },
    EpInternalRead,
    EpInternalState { value_timestamp: u64, value: Value },
    EpInternalWrite { value: Value },
    EpInternalAccept,
    EpInternalDecided { value: Value },

    // Uniform consensus
    UcPropose { value: Value },
    UcDecide { value: Value },

    // Atomic register
    NnarRead,
    NnarWrite { value: Value },
    NnarReadReturn { value: Value },
    NnarWriteReturn,
    NnarInternalRead { read_id: u64 },
    NnarInternalValue { read_id: u64, timestamp: u64, writer_rank: u32, value: Value },
    NnarInternalWrite { read_id: u64, timestamp: u64, writer_rank: u32, value: Value },
    NnarInternalAck { read_id: u64 },

    // Application boundary
    AppBroadcast { value: Value },
    AppValue { value: Value },
    AppPropose { topic: String, value: Value },
    AppDecide { topic: String, value: Value },
    AppWrite { register: String, value: Value },
    AppWriteReturn { register: String },
    AppRead { register: String },
    AppReadReturn { register: String, value: Value },

    // Hub control
    ProcRegistration { owner: String, index: u32 },
    ProcInitializeSystem { processes: Vec<ProcessId> },
    ProcDestroySystem,
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::NetworkMessage { .. } => "NETWORK_MESSAGE",
            Payload::PlSend { .. } => "PL_SEND",
            Payload::PlDeliver { .. } => "PL_DELIVER",
            Payload::BebBroadcast { .. } => "BEB_BROADCAST",
            Payload::BebDeliver { .. } => "BEB_DELIVER",
            Payload::EpfdTimeout => "EPFD_TIMEOUT",
            Payload::EpfdHeartbeatRequest => "EPFD_HEARTBEAT_REQUEST",
            Payload::EpfdHeartbeatReply => "EPFD_HEARTBEAT_REPLY",
            Payload::EpfdSuspect { .. } => "EPFD_SUSPECT",
            Payload::EpfdRestore { .. } => "EPFD_RESTORE",
            Payload::EldTrust { .. } => "ELD_TRUST",
            Payload::EcInternalNewEpoch { .. } => "EC_INTERNAL_NEW_EPOCH",
            Payload::EcInternalNack => "EC_INTERNAL_NACK",
            Payload::EcStartEpoch { .. } => "EC_START_EPOCH",
            Payload::EpPropose { .. } => "EP_PROPOSE",
            Payload::EpAbort => "EP_ABORT",
            Payload::EpAborted { .. } => "EP_ABORTED",
            Payload::EpDecide { .. } => "EP_DECIDE",
            Payload::EpInternalRead => "EP_INTERNAL_READ",
            Payload::EpInternalState { .. } => "EP_INTERNAL_STATE",
            Payload::EpInternalWrite { .. } => "EP_INTERNAL_WRITE",
            Payload::EpInternalAccept => "EP_INTERNAL_ACCEPT",
            Payload::EpInternalDecided { .. } => "EP_INTERNAL_DECIDED",
            Payload::UcPropose { .. } => "UC_PROPOSE",
            Payload::UcDecide { .. } => "UC_DECIDE",
            Payload::NnarRead => "NNAR_READ",
            Payload::NnarWrite { .. } => "NNAR_WRITE",
            Payload::NnarReadReturn { .. } => "NNAR_READ_RETURN",
            Payload::NnarWriteReturn => "NNAR_WRITE_RETURN",
            Payload::NnarInternalRead { .. } => "NNAR_INTERNAL_READ",
            Payload::NnarInternalValue { .. } => "NNAR_INTERNAL_VALUE",
            Payload::NnarInternalWrite { .. } => "NNAR_INTERNAL_WRITE",
            Payload::NnarInternalAck { .. } => "NNAR_INTERNAL_ACK",
            Payload::AppBroadcast { .. } => "APP_BROADCAST",
            Payload::AppValue { .. } => "APP_VALUE",
            Payload::AppPropose { .. } => "APP_PROPOSE",
            Payload::AppDecide { .. } => "APP_DECIDE",
            Payload::AppWrite { .. } => "APP_WRITE",
            Payload::AppWriteReturn { .. } => "APP_WRITE_RETURN",
            Payload::AppRead { .. } => "APP_READ",
            Payload::AppReadReturn { .. } => "APP_READ_RETURN",
            Payload::ProcRegistration { .. } => "PROC_REGISTRATION",
            Payload::ProcInitializeSystem { .. } => "PROC_INITIALIZE_SYSTEM",
            Payload::ProcDestroySystem => "PROC_DESTROY_SYSTEM",
        }
    }

    /// Inner message of a network envelope, if this is one.
    pub fn network_inner(&self) -> Option<&Message> {
        match self {
            Payload::NetworkMessage { message, .. } => Some(message),
            _ => None,
        }
    }
}
