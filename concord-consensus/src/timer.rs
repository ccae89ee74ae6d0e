use std::time::Duration;

use concord_common::Message;
use tokio::task::JoinHandle;

use crate::abstraction::EventQueue;

/// One-shot timer that enqueues `message` after `delay`.
///
/// The task never touches abstraction state; cancelling (or dropping) the
/// timer aborts it before it fires.
pub struct Timer {
    handle: JoinHandle<()>,
}

impl Timer {
    pub fn start(delay: Duration, queue: EventQueue, message: Message) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = queue.send(message);
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
