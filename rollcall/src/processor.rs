use std::collections::VecDeque;

use crate::clock::{Clock, Cycle};
use crate::config::SimulationConfig;
use crate::error::SimulationResult;
use crate::message::{Message, ProcId};

/// Per-processor message queues and send primitives.
///
/// A mailbox is the only way a processor touches the network: protocol logic
/// queues outbound messages and consumes inbound ones, while the
/// [`Network`](crate::Network) alone moves messages between mailboxes. Both
/// queues are strict FIFOs with no aliasing between them.
#[derive(Debug)]
pub struct Mailbox {
    id: ProcId,
    clock: Clock,
    datagram_latency: Cycle,
    broadcast_latency: Cycle,
    inbound: VecDeque<Message>,
    outbound: VecDeque<Message>,
    scheduled: Vec<Message>,
}

impl Mailbox {
    /// Creates a mailbox for processor `id` sharing the simulation clock.
    pub fn new(id: ProcId, clock: Clock, config: &SimulationConfig) -> Self {
        Self {
            id,
            clock,
            datagram_latency: config.datagram_latency,
            broadcast_latency: config.broadcast_latency,
            inbound: VecDeque::new(),
            outbound: VecDeque::new(),
            scheduled: Vec::new(),
        }
    }

    /// Returns the owning processor's id.
    pub fn id(&self) -> ProcId {
        self.id
    }

    /// Returns the current cycle as seen by this processor.
    pub fn now(&self) -> Cycle {
        self.clock.now()
    }

    /// Queues one point-to-point message to `dst`, timestamped at the
    /// current cycle, for collection by the network at the end of the cycle.
    pub fn send_datagram(&mut self, dst: ProcId, text: impl Into<String>, deadline: Cycle) {
        let msg = Message::datagram(
            self.id,
            dst,
            text,
            self.now(),
            deadline,
            self.datagram_latency,
        );
        tracing::debug!(src = self.id, dst, text = msg.text(), "send datagram");
        self.outbound.push_back(msg);
    }

    /// Queues one message addressed to every other processor.
    pub fn broadcast(&mut self, text: impl Into<String>, deadline: Cycle) {
        let msg = Message::broadcast(self.id, text, self.now(), deadline, self.broadcast_latency);
        tracing::debug!(src = self.id, text = msg.text(), "send broadcast");
        self.outbound.push_back(msg);
    }

    /// Schedules a broadcast to enter the network at cycle `send_at`.
    ///
    /// Due messages are released together with the ordinary outbound batch.
    pub fn schedule_broadcast(&mut self, text: impl Into<String>, deadline: Cycle, send_at: Cycle) {
        let msg = Message::broadcast(self.id, text, send_at, deadline, self.broadcast_latency);
        self.scheduled.push(msg);
    }

    /// Cancels every scheduled broadcast that has not yet been released.
    pub fn cancel_scheduled(&mut self) {
        self.scheduled.clear();
    }

    /// Appends a message to the inbound queue. Called only by the network.
    pub(crate) fn deliver(&mut self, msg: Message) {
        self.inbound.push_back(msg);
    }

    /// Returns and clears the queued outbound messages, releasing any
    /// scheduled broadcast whose send time has arrived. Called only by the
    /// network, once per cycle, after the processor has run.
    pub(crate) fn drain_outbound(&mut self, now: Cycle) -> Vec<Message> {
        let mut batch: Vec<Message> = self.outbound.drain(..).collect();
        let mut pending = Vec::new();
        for msg in self.scheduled.drain(..) {
            if msg.sent_at() <= now {
                batch.push(msg);
            } else {
                pending.push(msg);
            }
        }
        self.scheduled = pending;
        batch
    }

    /// Pops the oldest inbound message, or `None` when the queue is empty.
    pub fn next_inbound(&mut self) -> Option<Message> {
        self.inbound.pop_front()
    }
}

/// A processor participating in the simulation.
///
/// Implementations hold a [`Mailbox`] for communication and provide the
/// single protocol-specific [`step`](Processor::step), which the simulator
/// invokes once per cycle for every processor that has not failed.
pub trait Processor {
    /// Shared access to the processor's mailbox.
    fn mailbox(&self) -> &Mailbox;

    /// Exclusive access to the processor's mailbox.
    fn mailbox_mut(&mut self) -> &mut Mailbox;

    /// Runs one protocol cycle: inspect elapsed time and inbound messages,
    /// queue whatever needs sending. A returned error is a fatal protocol
    /// violation that aborts the simulation cycle.
    fn step(&mut self) -> SimulationResult<()>;

    /// Returns this processor's id.
    fn id(&self) -> ProcId {
        self.mailbox().id()
    }
}
