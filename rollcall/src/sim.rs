use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::clock::{Clock, Cycle};
use crate::config::SimulationConfig;
use crate::error::SimulationResult;
use crate::message::ProcId;
use crate::network::Network;
use crate::processor::Processor;
use crate::protocol::AttendanceProcessor;

/// The simulation orchestrator.
///
/// One cycle is one atomic step of the whole system, in a strict phase
/// order: every live processor runs its protocol step (ascending id), the
/// network ages and delivers messages and collects new sends, and finally
/// the clock ticks. Messages delivered during a cycle's network phase become
/// visible to processor steps only from the next cycle on; there is no
/// same-cycle loopback.
#[derive(Debug)]
pub struct Simulator<P: Processor> {
    clock: Clock,
    network: Network,
    processors: Vec<P>,
}

impl<P: Processor> Simulator<P> {
    /// Builds a simulator from a validated configuration and a processor
    /// factory, seeding the network's randomness from `config.seed`.
    pub fn new<F>(config: &SimulationConfig, make: F) -> SimulationResult<Self>
    where
        F: FnMut(ProcId, Clock) -> P,
    {
        Self::with_rng(
            config,
            Box::new(ChaCha8Rng::seed_from_u64(config.seed)),
            make,
        )
    }

    /// Like [`Simulator::new`] but with an explicit random source, so tests
    /// can supply deterministic or mocked generators.
    pub fn with_rng<F>(
        config: &SimulationConfig,
        rng: Box<dyn RngCore>,
        mut make: F,
    ) -> SimulationResult<Self>
    where
        F: FnMut(ProcId, Clock) -> P,
    {
        config.validate()?;

        let clock = Clock::new();
        let processors = (0..config.num_processors)
            .map(|id| make(id, clock.clone()))
            .collect();
        let network = Network::new(clock.clone(), config.failure.clone(), rng);

        Ok(Self {
            clock,
            network,
            processors,
        })
    }

    /// Advances the whole system by one cycle.
    ///
    /// A fatal protocol error from any processor step aborts the cycle and
    /// propagates; the simulation is not usable afterwards.
    pub fn advance_cycle(&mut self) -> SimulationResult<()> {
        for idx in 0..self.processors.len() {
            if !self.network.is_failed(self.processors[idx].id()) {
                self.processors[idx].step()?;
            }
        }
        self.network.advance(&mut self.processors);
        self.clock.tick();
        Ok(())
    }

    /// Advances the system by `cycles` cycles.
    pub fn run(&mut self, cycles: Cycle) -> SimulationResult<()> {
        for _ in 0..cycles {
            self.advance_cycle()?;
        }
        Ok(())
    }

    /// Returns the current cycle.
    pub fn current_cycle(&self) -> Cycle {
        self.clock.now()
    }

    /// Returns the processors, indexed by id.
    pub fn processors(&self) -> &[P] {
        &self.processors
    }

    /// Returns the network, for inspecting in-flight messages and failures.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Marks a processor as failed, bypassing the random injector. The
    /// processor stops stepping from the next cycle on and its outbound
    /// queue is never collected again.
    pub fn fail_processor(&mut self, id: ProcId) {
        self.network.fail_processor(id);
    }
}

impl Simulator<AttendanceProcessor> {
    /// Builds a simulator where every processor runs the attendance protocol.
    pub fn attendance(config: &SimulationConfig) -> SimulationResult<Self> {
        Simulator::new(config, |id, clock| {
            AttendanceProcessor::new(id, clock, config)
        })
    }
}
