use crate::clock::{Clock, Cycle};
use crate::config::SimulationConfig;
use crate::error::SimulationResult;
use crate::message::{Message, ProcId};
use crate::processor::{Mailbox, Processor};
use crate::protocol::wire::Payload;

/// A processor running the ring/attendance protocol.
///
/// Each processor keeps a private, locally believed membership list: the
/// ordered set of ids it thinks currently form the ring. Lists legitimately
/// diverge while a ring is (re)forming and are reconciled purely through
/// `NEWGROUP`/`PRESENT`/`LIST` exchange. The first member (smallest id in the
/// list) drives the token: once per period it sends a fresh `LIST` around the
/// ring and expects it back before the next period boundary. A member that
/// does not see the token in time declares a fault, broadcasts `NEWGROUP`,
/// and restarts ring formation from itself.
#[derive(Debug)]
pub struct AttendanceProcessor {
    mailbox: Mailbox,
    period: Cycle,
    datagram_latency: Cycle,
    broadcast_latency: Cycle,
    members: Vec<ProcId>,
    received_list: bool,
    group_inited_at: Cycle,
    found_error: bool,
}

impl AttendanceProcessor {
    /// Creates the protocol state machine for processor `id`.
    pub fn new(id: ProcId, clock: Clock, config: &SimulationConfig) -> Self {
        Self {
            mailbox: Mailbox::new(id, clock, config),
            period: config.period,
            datagram_latency: config.datagram_latency,
            broadcast_latency: config.broadcast_latency,
            members: Vec::new(),
            received_list: false,
            group_inited_at: 0,
            found_error: false,
        }
    }

    /// The membership list this processor currently believes in, ascending.
    pub fn members(&self) -> &[ProcId] {
        &self.members
    }

    /// Whether the token (or a `PRESENT` liveness signal) was seen this period.
    pub fn received_list(&self) -> bool {
        self.received_list
    }

    /// Whether this processor has detected a fault in the current period.
    pub fn found_error(&self) -> bool {
        self.found_error
    }

    /// The cycle at which the current membership list was (re)established.
    pub fn group_inited_at(&self) -> Cycle {
        self.group_inited_at
    }

    /// Returns `true` if this processor is the smallest id in its list.
    ///
    /// # Panics
    ///
    /// Panics if the membership list has fewer than two entries. Ring
    /// position is meaningless before the ring has formed; callers check
    /// formation first.
    fn is_first_member(&self) -> bool {
        assert!(
            self.members.len() >= 2,
            "ring position query on an unformed membership list"
        );
        self.members[0] == self.id()
    }

    /// Returns `true` if this processor is the largest id in its list.
    ///
    /// # Panics
    ///
    /// Panics if the membership list has fewer than two entries.
    fn is_last_member(&self) -> bool {
        assert!(
            self.members.len() >= 2,
            "ring position query on an unformed membership list"
        );
        self.members[self.members.len() - 1] == self.id()
    }

    /// Index of this processor within its membership list.
    fn position(&self) -> usize {
        self.members
            .iter()
            .position(|&m| m == self.id())
            .expect("processor missing from its own membership list")
    }

    /// The member after this one in ring order. Not to be called on the last
    /// member; the token wraps to the first member instead.
    fn next_member(&self) -> ProcId {
        self.members[self.position() + 1]
    }

    /// Marks the current period faulty and restarts ring formation from this
    /// processor alone.
    fn declare_fault(&mut self, now: Cycle) {
        tracing::debug!(proc = self.id(), cycle = now, "token overdue, reforming ring");
        self.found_error = true;
        self.mailbox
            .broadcast(Payload::NewGroup.encode(), now + self.broadcast_latency);
        self.group_inited_at = now;
        self.members = vec![self.id()];
    }

    /// The time-driven part of the cycle, run exactly once before any inbound
    /// message is consumed.
    fn timed_actions(&mut self, now: Cycle) {
        // Bootstrap: processor 0 starts the very first ring.
        if now == 0 && self.id() == 0 {
            self.mailbox
                .broadcast(Payload::NewGroup.encode(), now + self.broadcast_latency);
            self.members = vec![self.id()];
            return;
        }

        // No ring yet: only react to inbound messages this cycle.
        if self.members.len() < 2 {
            return;
        }

        if self.is_first_member() {
            if (now - self.group_inited_at) % self.period == 0 {
                if self.received_list {
                    // The previous period completed; start a fresh token.
                    self.received_list = false;
                    let token = Payload::List(vec![self.id()]).encode();
                    let next = self.next_member();
                    self.mailbox
                        .send_datagram(next, token, now + self.datagram_latency);
                } else {
                    // The token never came back in time.
                    self.declare_fault(now);
                }
            }
        } else {
            // A non-first member expects the token once the first member's
            // send plus per-hop propagation has had time to reach it.
            if !self.found_error && !self.received_list {
                let index = self.position() as Cycle;
                if (now - self.group_inited_at) % self.period > index * self.datagram_latency {
                    self.declare_fault(now);
                }
            }
            if (now - self.group_inited_at) % self.period == 0 {
                self.received_list = false;
                self.found_error = false;
            }
        }
    }

    fn handle(&mut self, msg: &Message, now: Cycle) -> SimulationResult<()> {
        match Payload::parse(msg.text())? {
            Payload::List(mut ids) => {
                ids.push(self.id());
                if self.members.len() >= 2 {
                    if self.is_first_member() {
                        // Token cycle complete; absorb it.
                        tracing::debug!(proc = self.id(), cycle = now, "token completed circulation");
                    } else {
                        let dst = if self.is_last_member() {
                            self.members[0]
                        } else {
                            self.next_member()
                        };
                        self.mailbox.send_datagram(
                            dst,
                            Payload::List(ids).encode(),
                            now + self.datagram_latency,
                        );
                    }
                }
                // A token that arrives while this processor's own list is
                // still unformed (a reformation race) cannot be routed, but
                // it still proves the ring alive for timeout purposes.
                self.received_list = true;
            }
            Payload::NewGroup => {
                // Unconditional reset signal: announce liveness and begin
                // accreting a brand-new ring seeded by the announcer and us.
                self.found_error = true;
                self.mailbox
                    .broadcast(Payload::Present.encode(), now + self.broadcast_latency);
                let mut members = vec![msg.src(), self.id()];
                members.sort_unstable();
                self.members = members;
            }
            Payload::Present => {
                self.members.push(msg.src());
                self.members.sort_unstable();
                self.members.dedup();
                self.received_list = true;
            }
        }
        Ok(())
    }
}

impl Processor for AttendanceProcessor {
    fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    fn mailbox_mut(&mut self) -> &mut Mailbox {
        &mut self.mailbox
    }

    fn step(&mut self) -> SimulationResult<()> {
        let now = self.mailbox.now();

        self.timed_actions(now);

        // Drain the inbound queue. Stale messages are an expected condition:
        // they are discarded without touching any state and do not use up
        // this cycle's processing.
        while let Some(msg) = self.mailbox.next_inbound() {
            if now > msg.deadline() {
                tracing::trace!(
                    proc = self.id(),
                    src = msg.src(),
                    text = msg.text(),
                    cycle = now,
                    "discard stale message"
                );
                continue;
            }
            tracing::debug!(
                proc = self.id(),
                src = msg.src(),
                text = msg.text(),
                cycle = now,
                "recv"
            );
            self.handle(&msg, now)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;

    fn processor(id: ProcId) -> (AttendanceProcessor, Clock) {
        let clock = Clock::new();
        let proc = AttendanceProcessor::new(id, clock.clone(), &SimulationConfig::default());
        (proc, clock)
    }

    fn tick_to(clock: &Clock, cycle: Cycle) {
        while clock.now() < cycle {
            clock.tick();
        }
    }

    fn outbound_texts(proc: &mut AttendanceProcessor) -> Vec<String> {
        let now = proc.mailbox.now();
        proc.mailbox_mut()
            .drain_outbound(now)
            .into_iter()
            .map(|m| m.text().to_string())
            .collect()
    }

    #[test]
    fn processor_zero_bootstraps_at_cycle_zero() {
        let (mut proc, _clock) = processor(0);
        proc.step().expect("step");
        assert_eq!(proc.members(), &[0]);
        assert_eq!(outbound_texts(&mut proc), vec!["NEWGROUP:"]);
    }

    #[test]
    fn other_processors_do_not_bootstrap() {
        let (mut proc, _clock) = processor(1);
        proc.step().expect("step");
        assert!(proc.members().is_empty());
        assert!(outbound_texts(&mut proc).is_empty());
    }

    #[test]
    fn newgroup_resets_membership_to_the_sorted_pair() {
        let (mut proc, clock) = processor(2);
        proc.members = vec![0, 1, 2];
        tick_to(&clock, 2);

        proc.mailbox_mut()
            .deliver(Message::broadcast(0, "NEWGROUP:", 0, 2, 2));
        proc.step().expect("step");

        assert_eq!(proc.members(), &[0, 2]);
        assert!(proc.found_error());
        assert_eq!(outbound_texts(&mut proc), vec!["PRESENT:"]);
    }

    #[test]
    fn present_accretes_sorted_unique_membership() {
        let (mut proc, clock) = processor(0);
        proc.members = vec![0];
        tick_to(&clock, 4);

        proc.mailbox_mut()
            .deliver(Message::broadcast(2, "PRESENT:", 2, 4, 2));
        proc.mailbox_mut()
            .deliver(Message::broadcast(1, "PRESENT:", 2, 4, 2));
        // A duplicate announcement must not produce a duplicate entry.
        proc.mailbox_mut()
            .deliver(Message::broadcast(1, "PRESENT:", 2, 4, 2));
        proc.step().expect("step");

        assert_eq!(proc.members(), &[0, 1, 2]);
        assert!(proc.received_list());
    }

    #[test]
    fn first_member_emits_the_token_at_the_period_boundary() {
        let (mut proc, clock) = processor(0);
        proc.members = vec![0, 1, 2];
        proc.received_list = true;
        tick_to(&clock, 10);

        proc.step().expect("step");

        assert!(!proc.received_list());
        let now = clock.now();
        let batch = proc.mailbox_mut().drain_outbound(now);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text(), "LIST:0");
        assert!(batch[0].is_datagram());
        assert_eq!(batch[0].deadline(), 12);
    }

    #[test]
    fn first_member_declares_fault_when_the_token_is_missing() {
        let (mut proc, clock) = processor(0);
        proc.members = vec![0, 1, 2];
        tick_to(&clock, 20);

        proc.step().expect("step");

        assert!(proc.found_error());
        assert_eq!(proc.members(), &[0]);
        assert_eq!(proc.group_inited_at(), 20);
        assert_eq!(outbound_texts(&mut proc), vec!["NEWGROUP:"]);
    }

    #[test]
    fn middle_member_appends_itself_and_forwards_the_token() {
        let (mut proc, clock) = processor(1);
        proc.members = vec![0, 1, 2];
        tick_to(&clock, 12);

        proc.mailbox_mut()
            .deliver(Message::datagram(0, 1, "LIST:0", 10, 12, 2));
        proc.step().expect("step");

        assert!(proc.received_list());
        let now = clock.now();
        let batch = proc.mailbox_mut().drain_outbound(now);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text(), "LIST:0,1");
        assert_eq!(batch[0].kind(), crate::message::MessageKind::Datagram { dst: 2 });
    }

    #[test]
    fn last_member_wraps_the_token_to_the_first() {
        let (mut proc, clock) = processor(2);
        proc.members = vec![0, 1, 2];
        tick_to(&clock, 14);

        proc.mailbox_mut()
            .deliver(Message::datagram(1, 2, "LIST:0,1", 12, 14, 2));
        proc.step().expect("step");

        let now = clock.now();
        let batch = proc.mailbox_mut().drain_outbound(now);
        assert_eq!(batch[0].text(), "LIST:0,1,2");
        assert_eq!(batch[0].kind(), crate::message::MessageKind::Datagram { dst: 0 });
    }

    #[test]
    fn first_member_absorbs_the_returning_token() {
        let (mut proc, clock) = processor(0);
        proc.members = vec![0, 1, 2];
        tick_to(&clock, 16);

        proc.mailbox_mut()
            .deliver(Message::datagram(2, 0, "LIST:0,1,2", 14, 16, 2));
        proc.step().expect("step");

        assert!(proc.received_list());
        assert!(outbound_texts(&mut proc).is_empty());
    }

    #[test]
    fn non_first_member_declares_fault_once_the_token_is_overdue() {
        let (mut proc, clock) = processor(1);
        proc.members = vec![0, 1, 2];
        // Index 1, datagram latency 2: the token is overdue strictly after
        // cycle offset 2 within the period.
        tick_to(&clock, 12);
        proc.step().expect("step");
        assert!(!proc.found_error(), "offset 2 is not yet overdue");

        tick_to(&clock, 13);
        proc.step().expect("step");

        // The fault restarts ring formation from this processor alone. Its
        // new period starts at the declaration cycle, so the boundary reset
        // has already cleared the session flags for it.
        assert_eq!(proc.members(), &[1]);
        assert_eq!(proc.group_inited_at(), 13);
        assert_eq!(outbound_texts(&mut proc), vec!["NEWGROUP:"]);
        assert!(!proc.found_error());
        assert!(!proc.received_list());
    }

    #[test]
    fn period_boundary_resets_session_flags_together() {
        let (mut proc, clock) = processor(1);
        proc.members = vec![0, 1, 2];
        proc.received_list = true;
        proc.found_error = true;
        tick_to(&clock, 10);

        proc.step().expect("step");

        assert!(!proc.received_list());
        assert!(!proc.found_error());
    }

    #[test]
    fn stale_messages_are_discarded_without_any_state_change() {
        let (mut proc, clock) = processor(1);
        proc.members = vec![0, 1, 2];
        proc.received_list = true;
        tick_to(&clock, 5);

        // Both deadlines are in the past at cycle 5.
        proc.mailbox_mut()
            .deliver(Message::broadcast(0, "NEWGROUP:", 0, 2, 2));
        proc.mailbox_mut()
            .deliver(Message::datagram(0, 1, "LIST:0", 2, 4, 2));
        proc.step().expect("step");

        assert_eq!(proc.members(), &[0, 1, 2]);
        assert!(proc.received_list());
        assert!(!proc.found_error());
        assert!(outbound_texts(&mut proc).is_empty());
    }

    #[test]
    fn stale_messages_do_not_shadow_live_ones_in_the_same_cycle() {
        let (mut proc, clock) = processor(1);
        proc.members = vec![0, 1, 2];
        proc.received_list = true;
        tick_to(&clock, 5);

        proc.mailbox_mut()
            .deliver(Message::broadcast(0, "NEWGROUP:", 0, 2, 2)); // stale
        proc.mailbox_mut()
            .deliver(Message::broadcast(2, "PRESENT:", 3, 5, 2)); // live
        proc.step().expect("step");

        // The stale NEWGROUP was skipped, the live PRESENT handled.
        assert_eq!(proc.members(), &[0, 1, 2]);
        assert!(!proc.found_error());
        assert!(proc.received_list());
    }

    #[test]
    fn token_arriving_during_reformation_is_absorbed() {
        let (mut proc, clock) = processor(1);
        proc.members = vec![1];
        proc.found_error = true;
        tick_to(&clock, 12);

        proc.mailbox_mut()
            .deliver(Message::datagram(0, 1, "LIST:0", 10, 12, 2));
        proc.step().expect("step");

        assert!(proc.received_list());
        assert!(outbound_texts(&mut proc).is_empty());
    }

    #[test]
    fn malformed_payload_aborts_the_step() {
        let (mut proc, clock) = processor(1);
        tick_to(&clock, 2);
        proc.mailbox_mut()
            .deliver(Message::broadcast(0, "GOODBYE:", 0, 2, 2));

        assert!(matches!(
            proc.step(),
            Err(SimulationError::MalformedMessage(_))
        ));
    }

    #[test]
    #[should_panic(expected = "unformed membership list")]
    fn ring_position_queries_require_a_formed_ring() {
        let (proc, _clock) = processor(0);
        let _ = proc.is_first_member();
    }
}
