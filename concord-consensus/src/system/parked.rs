use std::collections::VecDeque;

use concord_common::{AbstractionId, Message};
use tracing::{debug, warn};

/// Messages addressed to epoch instances that are not registered yet.
pub(crate) struct Parked {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Parked {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Parks `message`; when full, the oldest parked message is dropped.
    pub fn park(&mut self, message: Message) {
        if self.len() >= self.capacity {
            if let Some(oldest) = self.messages.pop_front() {
                warn!("{} messages parked, dropping {} for {}", self.len() + 1, oldest.kind(), oldest.to);
            }
        }
        debug!("parking {} for {}", message.kind(), message.to);
        self.messages.push_back(message);
    }

    /// Takes the messages waiting for `epoch` (an `app.uc[t].ep[ts]` id) in
    /// arrival order, and drops those waiting for older epochs of the same topic.
    pub fn release(&mut self, epoch: &AbstractionId) -> Vec<Message> {
        let (Some(ts), Some(topic)) = (epoch.epoch(), epoch.parent()) else {
            return Vec::new();
        };

        let mut released = Vec::new();
        let mut kept = VecDeque::with_capacity(self.messages.len());
        for message in self.messages.drain(..) {
            let waiting_for = message.to.epoch_root();
            let same_topic = waiting_for.as_ref().and_then(|e| e.parent()).as_ref() == Some(&topic);
            match message.to.epoch() {
                Some(e) if same_topic && e == ts => released.push(message),
                Some(e) if same_topic && e < ts => debug!("discarding stale {} for {}", message.kind(), message.to),
                _ => kept.push_back(message),
            }
        }
        self.messages = kept;
        released
    }
}
