use std::collections::BTreeSet;

use rand::{Rng, RngCore};

use crate::clock::{Clock, Cycle};
use crate::config::FailureConfiguration;
use crate::message::{Message, MessageKind, ProcId};
use crate::processor::Processor;

/// The simulated bus connecting every mailbox, plus the failure injector.
///
/// The network owns all in-flight messages. Each cycle it optionally injects
/// one random processor failure, ages the bus by one cycle of simulated time
/// (delivering every message whose delay counter reaches zero), and collects
/// the outbound batches of the processors that are still alive. The routine
/// has no failure mode: malformed messages are unrepresentable by
/// construction, and delivery into a failed processor's mailbox is a no-op
/// drop because that mailbox is never consumed again.
pub struct Network {
    clock: Clock,
    bus: Vec<Message>,
    failure: Option<FailureConfiguration>,
    rng: Box<dyn RngCore>,
    failed: BTreeSet<ProcId>,
    last_failure_at: Cycle,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("bus", &self.bus)
            .field("failure", &self.failure)
            .field("failed", &self.failed)
            .field("last_failure_at", &self.last_failure_at)
            .finish_non_exhaustive()
    }
}

impl Network {
    /// Creates a network with the given failure configuration and random
    /// source. The random source is an explicit dependency so tests can
    /// supply deterministic or mocked generators.
    pub fn new(
        clock: Clock,
        failure: Option<FailureConfiguration>,
        rng: Box<dyn RngCore>,
    ) -> Self {
        Self {
            clock,
            bus: Vec::new(),
            failure,
            rng,
            failed: BTreeSet::new(),
            last_failure_at: 0,
        }
    }

    /// Returns `true` if the processor has failed.
    pub fn is_failed(&self, id: ProcId) -> bool {
        self.failed.contains(&id)
    }

    /// Returns the set of failed processors. Membership is permanent.
    pub fn failed(&self) -> &BTreeSet<ProcId> {
        &self.failed
    }

    /// Returns the number of messages currently in flight.
    pub fn in_flight(&self) -> usize {
        self.bus.len()
    }

    /// Marks a processor as failed, bypassing the random injector.
    ///
    /// A failed processor stops stepping and its outbound queue is never
    /// collected again, but it remains a valid delivery target.
    pub fn fail_processor(&mut self, id: ProcId) {
        tracing::warn!(proc = id, cycle = self.clock.now(), "processor killed");
        self.failed.insert(id);
    }

    /// Advances the network by one cycle: failure injection, then delivery,
    /// then collection of new outbound messages from live processors.
    ///
    /// Messages collected this cycle receive their first countdown
    /// immediately, so a message with latency `L` sent at cycle `t` reaches
    /// its destination mailbox during cycle `t + L - 1` and is dequeued by
    /// the recipient at cycle `t + L`.
    pub fn advance<P: Processor>(&mut self, processors: &mut [P]) {
        let now = self.clock.now();

        self.maybe_inject_failure(processors.len(), now);

        // Age and deliver messages already on the bus.
        let in_flight = std::mem::take(&mut self.bus);
        for mut msg in in_flight {
            if msg.count_down() {
                Self::deliver(processors, msg, now);
            } else {
                self.bus.push(msg);
            }
        }

        // Collect new sends from live processors.
        for idx in 0..processors.len() {
            if self.failed.contains(&processors[idx].id()) {
                continue;
            }
            for mut msg in processors[idx].mailbox_mut().drain_outbound(now) {
                if msg.count_down() {
                    Self::deliver(processors, msg, now);
                } else {
                    self.bus.push(msg);
                }
            }
        }
    }

    /// Injects at most one failure per cycle, only while at least three
    /// processors remain alive and the configured gap since the previous
    /// failure has elapsed.
    fn maybe_inject_failure(&mut self, num_processors: usize, now: Cycle) {
        let Some(failure) = &self.failure else {
            return;
        };
        let live: Vec<ProcId> = (0..num_processors)
            .filter(|id| !self.failed.contains(id))
            .collect();
        if live.len() < 3 {
            return;
        }
        if self.last_failure_at + failure.gap >= now {
            return;
        }
        if self.rng.gen::<f64>() > failure.chance {
            return;
        }

        let victim = live[self.rng.gen_range(0..live.len())];
        self.failed.insert(victim);
        self.last_failure_at = now;
        tracing::warn!(proc = victim, cycle = now, "processor failed");
    }

    fn deliver<P: Processor>(processors: &mut [P], msg: Message, now: Cycle) {
        match msg.kind() {
            MessageKind::Datagram { dst } => {
                tracing::debug!(src = msg.src(), dst, text = msg.text(), cycle = now, "deliver");
                if let Some(proc) = processors.get_mut(dst) {
                    proc.mailbox_mut().deliver(msg);
                }
            }
            MessageKind::Broadcast => {
                tracing::debug!(src = msg.src(), text = msg.text(), cycle = now, "deliver broadcast");
                for proc in processors.iter_mut() {
                    if proc.id() != msg.src() {
                        proc.mailbox_mut().deliver(msg.clone());
                    }
                }
            }
        }
    }
}
