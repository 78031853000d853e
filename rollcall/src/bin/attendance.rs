//! Binary target for the attendance protocol simulation.
//!
//! Runs the default three-processor ring with random failure injection for
//! fifty cycles and logs every send, delivery, and failure event.

use std::process;

use rollcall::{FailureConfiguration, Processor, SimulationConfig, Simulator};

fn main() {
    tracing_subscriber::fmt::init();

    let config = SimulationConfig {
        failure: Some(FailureConfiguration::default()),
        ..SimulationConfig::default()
    };

    let mut sim = match Simulator::attendance(&config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("ERROR: {err}");
            process::exit(1);
        }
    };

    for _ in 0..50 {
        tracing::info!(cycle = sim.current_cycle(), "cycle begins");
        if let Err(err) = sim.advance_cycle() {
            eprintln!("ERROR: {err}");
            process::exit(1);
        }
    }

    for proc in sim.processors() {
        tracing::info!(
            proc = proc.id(),
            members = ?proc.members(),
            failed = sim.network().is_failed(proc.id()),
            "final state"
        );
    }
}
