use std::{cell::Cell, rc::Rc};

/// A cycle number. Simulated time advances in whole cycles.
pub type Cycle = u64;

/// The shared monotonic cycle counter of a simulation.
///
/// Cloning a `Clock` yields another handle to the same underlying counter,
/// so every processor and the network observe identical time. Only the
/// [`Simulator`](crate::Simulator) ticks it, once at the end of each cycle,
/// which is why no further coordination is needed.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    cycle: Rc<Cell<Cycle>>,
}

impl Clock {
    /// Creates a new clock starting at cycle 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by one cycle. Infallible.
    pub fn tick(&self) {
        self.cycle.set(self.cycle.get() + 1);
    }

    /// Returns the current cycle. Pure read.
    pub fn now(&self) -> Cycle {
        self.cycle.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_ticks_by_one() {
        let clock = Clock::new();
        assert_eq!(clock.now(), 0);
        clock.tick();
        clock.tick();
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn clones_share_the_same_counter() {
        let clock = Clock::new();
        let handle = clock.clone();
        clock.tick();
        assert_eq!(handle.now(), 1);
        handle.tick();
        assert_eq!(clock.now(), 2);
    }
}
