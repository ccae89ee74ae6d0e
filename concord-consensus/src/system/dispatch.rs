use concord_common::{AbstractionId, Family, Message, Segment};
use tracing::{debug, error, info, warn};

use super::System;
use crate::abstraction::Context;
use crate::consensus::consensus_subtree;
use crate::error::ConsensusError;
use crate::register::register_subtree;

/// Where a message for `id` should go.
enum Route {
    Ready,
    Park,
    Stale,
    Drop(ConsensusError),
}

impl System {
    /// Handles one queued message and applies the handler's effects.
    pub(super) async fn dispatch(&mut self, message: Message) {
        let to = message.to.clone();
        match self.route(&to) {
            Route::Ready => {}
            Route::Park => {
                self.parked.park(message);
                return;
            }
            Route::Stale => {
                debug!("discarding {} for retired {}", message.kind(), to);
                return;
            }
            Route::Drop(e) => {
                warn!("dropping {} in {}: {}", message.kind(), self.membership.system_id, e);
                return;
            }
        }

        let Some(instance) = self.registry.get_mut(&to) else {
            return;
        };

        debug!("{} -> {}", message.kind(), to);
        let kind = message.kind();
        let mut ctx = Context::new(self.queue.clone());
        if let Err(e) = instance.handle(message, &mut ctx) {
            match e {
                ConsensusError::UnsupportedMessage { .. } | ConsensusError::UnknownSender { .. } => {
                    warn!("{} dropped {}: {}", to, kind, e)
                }
                _ => error!("{} failed on {}: {}", to, kind, e),
            }
        }

        self.apply_retirements(&mut ctx);
        self.apply_registrations(&mut ctx);

        for t in ctx.take_transmissions() {
            if let Err(e) = self.transport.send_to(&t.destination, t.message).await {
                warn!("send to {} failed: {}", t.destination, e);
            }
        }
    }

    /// Resolves `to`, lazily instantiating its register or consensus subtree.
    fn route(&mut self, to: &AbstractionId) -> Route {
        if self.registry.contains(to) {
            return Route::Ready;
        }

        let root = match to.family() {
            Some(Family::Register(key)) => {
                let root = AbstractionId::register(&key);
                if !self.registry.contains(&root) {
                    info!("🧩 Instantiating register {} in {}", key, self.membership.system_id);
                    self.registry.register_all(register_subtree(&key, &self.membership));
                }
                root
            }
            Some(Family::Consensus(topic)) => {
                let root = AbstractionId::consensus(&topic);
                if !self.registry.contains(&root) {
                    info!("🧩 Instantiating consensus {} in {}", topic, self.membership.system_id);
                    self.registry.register_all(consensus_subtree(
                        &topic,
                        &self.membership,
                        &self.config,
                        &self.queue,
                    ));
                }
                root
            }
            _ => return Route::Drop(ConsensusError::Unroutable(to.clone())),
        };

        if self.registry.contains(to) {
            return Route::Ready;
        }
        // Epoch instances only come from an abort handover; wait for it.
        if let Some(ts) = to.epoch().filter(|_| to.is_within(&root)) {
            if self.retired.get(&root).is_some_and(|&last| ts <= last) {
                return Route::Stale;
            }
            return Route::Park;
        }
        Route::Drop(ConsensusError::Unroutable(to.clone()))
    }

    fn apply_retirements(&mut self, ctx: &mut Context) {
        for root in ctx.take_retirements() {
            let removed = self.registry.remove_within(&root);
            debug!("retired {} ({} instances)", root, removed);
            if let (Some(ts), Some(uc)) = (root.epoch(), root.parent()) {
                let last = self.retired.entry(uc).or_insert(ts);
                *last = (*last).max(ts);
            }
        }
    }

    fn apply_registrations(&mut self, ctx: &mut Context) {
        let mut epochs = Vec::new();
        for (id, instance) in ctx.take_registrations() {
            if matches!(id.last(), Some(Segment::Ep(_))) {
                epochs.push(id.clone());
            }
            self.registry.register(id, instance);
        }

        for epoch in epochs {
            for message in self.parked.release(&epoch) {
                ctx.emit(message);
            }
        }
    }
}
