use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use concord_common::{AbstractionId, Message, Payload, ProcessId};
use tracing::{debug, info};

use crate::abstraction::{Abstraction, Context, EventQueue};
use crate::error::ConsensusError;
use crate::membership::Membership;
use crate::timer::Timer;

/// Eventually perfect failure detector with an increasing timeout.
///
/// Every round it heartbeats all members; a member silent for a whole round
/// is suspected, a suspected member that answers again is restored and the
/// round length grows by `delta`. The delay never shrinks.
pub struct Epfd {
    id: AbstractionId,
    parent: AbstractionId,
    membership: Arc<Membership>,
    alive: HashSet<ProcessId>,
    suspected: HashSet<ProcessId>,
    delta: Duration,
    delay: Duration,
    queue: EventQueue,
    timer: Option<Timer>,
}

impl Epfd {
    /// Builds the detector and arms its first round.
    pub fn new(
        id: AbstractionId,
        parent: AbstractionId,
        membership: Arc<Membership>,
        delta: Duration,
        queue: EventQueue,
    ) -> Self {
        let alive = membership.processes.iter().cloned().collect();
        let mut epfd = Self {
            id,
            parent,
            membership,
            alive,
            suspected: HashSet::new(),
            delta,
            delay: delta,
            queue,
            timer: None,
        };
        epfd.start_timer();
        epfd
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_suspected(&self, process: &ProcessId) -> bool {
        self.suspected.contains(process)
    }

    fn start_timer(&mut self) {
        let timeout = Message::new(self.id.clone(), self.id.clone(), Payload::EpfdTimeout);
        self.timer = Some(Timer::start(self.delay, self.queue.clone(), timeout));
    }

    fn on_timeout(&mut self, ctx: &mut Context) {
        if self.alive.intersection(&self.suspected).next().is_some() {
            self.delay += self.delta;
            info!("⏱️ {} timeout raised to {:?}", self.id, self.delay);
        }

        for p in &self.membership.processes {
            let alive = self.alive.contains(p);
            let suspected = self.suspected.contains(p);

            if !alive && !suspected {
                self.suspected.insert(p.clone());
                tracing::info!(target: "consensus", "EVENT:SUSPECT system={} process={}", self.membership.system_id, p);
                ctx.emit(Message::new(
                    self.id.clone(),
                    self.parent.clone(),
                    Payload::EpfdSuspect { process: p.clone() },
                ));
            } else if alive && suspected {
                self.suspected.remove(p);
                tracing::info!(target: "consensus", "EVENT:RESTORE system={} process={}", self.membership.system_id, p);
                ctx.emit(Message::new(
                    self.id.clone(),
                    self.parent.clone(),
                    Payload::EpfdRestore { process: p.clone() },
                ));
            }

            ctx.emit(Message::new(
                self.id.clone(),
                self.id.pl(),
                Payload::PlSend {
                    destination: Some(p.clone()),
                    message: Box::new(Message::new(
                        self.id.clone(),
                        self.id.clone(),
                        Payload::EpfdHeartbeatRequest,
                    )),
                },
            ));
        }

        self.alive.clear();
        self.start_timer();
    }
}

impl Abstraction for Epfd {
    fn handle(&mut self, message: Message, ctx: &mut Context) -> Result<(), ConsensusError> {
        match message.payload {
            Payload::EpfdTimeout => {
                self.on_timeout(ctx);
                Ok(())
            }
            Payload::PlDeliver { sender, message: inner } => match inner.payload {
                Payload::EpfdHeartbeatRequest => {
                    ctx.emit(Message::new(
                        self.id.clone(),
                        self.id.pl(),
                        Payload::PlSend {
                            destination: Some(sender),
                            message: Box::new(Message::new(
                                self.id.clone(),
                                self.id.clone(),
                                Payload::EpfdHeartbeatReply,
                            )),
                        },
                    ));
                    Ok(())
                }
                Payload::EpfdHeartbeatReply => {
                    debug!("{} heartbeat from {}", self.id, sender);
                    self.alive.insert(sender);
                    Ok(())
                }
                _ => Err(ConsensusError::unsupported(&self.id, &inner)),
            },
            _ => Err(ConsensusError::unsupported(&self.id, &message)),
        }
    }

    fn destroy(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
