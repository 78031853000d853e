//! # Rollcall
//!
//! A discrete-cycle simulator for a ring-based group-membership
//! ("attendance") protocol.
//!
//! The simulator models a set of independent processors exchanging messages
//! over an in-memory bus with per-message delivery latency, advisory
//! deadlines, and randomly injected permanent processor failures. Each live
//! processor runs the attendance protocol: processor 0 bootstraps a ring by
//! broadcasting `NEWGROUP`, everyone alive answers `PRESENT`, and from then
//! on a `LIST` token circulates the ring once per period, in ascending-id
//! order. A member that does not see the token in time declares a fault and
//! restarts ring formation, so the ring eventually re-forms around the
//! processors that are still alive.
//!
//! Execution is single-threaded and fully deterministic for a given seed:
//! one cycle runs every live processor's protocol step, then the network
//! phase (failure injection, delivery, collection), then a clock tick.
//!
//! ## Example Usage
//!
//! ```rust
//! use rollcall::{SimulationConfig, Simulator};
//!
//! let config = SimulationConfig::default();
//! let mut sim = Simulator::attendance(&config).expect("valid configuration");
//!
//! sim.run(50).expect("no protocol errors");
//!
//! // Without failures the ring converges on every processor.
//! for proc in sim.processors() {
//!     assert_eq!(proc.members(), &[0, 1, 2]);
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// The shared monotonic cycle counter.
pub mod clock;
/// Simulation and failure-injection configuration.
pub mod config;
/// Error types for simulation operations.
pub mod error;
/// Messages in flight on the simulated network.
pub mod message;
/// The simulated bus and failure injector.
pub mod network;
/// Mailbox primitives and the processor abstraction.
pub mod processor;
/// The ring/attendance protocol.
pub mod protocol;
/// The simulation orchestrator.
pub mod sim;

pub use clock::{Clock, Cycle};
pub use config::{FailureConfiguration, SimulationConfig};
pub use error::{SimulationError, SimulationResult};
pub use message::{Message, MessageKind, ProcId};
pub use network::Network;
pub use processor::{Mailbox, Processor};
pub use protocol::{AttendanceProcessor, Payload};
pub use sim::Simulator;
