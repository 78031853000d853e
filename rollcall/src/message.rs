use crate::clock::Cycle;

/// A processor identifier, stable for the processor's lifetime.
pub type ProcId = usize;

/// Whether a message targets one processor or every other processor.
///
/// The datagram destination lives inside the variant so that an unaddressed
/// datagram is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Point-to-point delivery to a single destination.
    Datagram {
        /// The destination processor.
        dst: ProcId,
    },
    /// Fan-out delivery to every processor except the sender.
    Broadcast,
}

/// A unit of communication in flight on the simulated network.
///
/// Messages are immutable after creation except for the delay counter, which
/// the network decrements by exactly one per cycle. A message whose counter
/// reaches zero is delivered and removed from the bus; whether the recipient
/// actually processes it depends on the `deadline` staleness check at dequeue
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    src: ProcId,
    sent_at: Cycle,
    deadline: Cycle,
    text: String,
    remaining_delay: Cycle,
}

impl Message {
    /// Creates a point-to-point message.
    pub fn datagram(
        src: ProcId,
        dst: ProcId,
        text: impl Into<String>,
        sent_at: Cycle,
        deadline: Cycle,
        delay: Cycle,
    ) -> Self {
        Self {
            kind: MessageKind::Datagram { dst },
            src,
            sent_at,
            deadline,
            text: text.into(),
            remaining_delay: delay,
        }
    }

    /// Creates a fan-out message.
    pub fn broadcast(
        src: ProcId,
        text: impl Into<String>,
        sent_at: Cycle,
        deadline: Cycle,
        delay: Cycle,
    ) -> Self {
        Self {
            kind: MessageKind::Broadcast,
            src,
            sent_at,
            deadline,
            text: text.into(),
            remaining_delay: delay,
        }
    }

    /// Returns the message kind.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns `true` for point-to-point messages.
    pub fn is_datagram(&self) -> bool {
        matches!(self.kind, MessageKind::Datagram { .. })
    }

    /// Returns `true` for fan-out messages.
    pub fn is_broadcast(&self) -> bool {
        self.kind == MessageKind::Broadcast
    }

    /// Returns the sending processor.
    pub fn src(&self) -> ProcId {
        self.src
    }

    /// Returns the cycle at which the message was created.
    pub fn sent_at(&self) -> Cycle {
        self.sent_at
    }

    /// Returns the absolute cycle after which the message is stale.
    pub fn deadline(&self) -> Cycle {
        self.deadline
    }

    /// Returns the protocol payload text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Counts the delay counter down by one cycle of simulated time.
    ///
    /// Returns `true` once the counter reaches zero, meaning the message is
    /// ready for delivery.
    pub(crate) fn count_down(&mut self) -> bool {
        self.remaining_delay = self.remaining_delay.saturating_sub(1);
        self.remaining_delay == 0
    }
}
