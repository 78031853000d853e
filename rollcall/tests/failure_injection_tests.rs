use std::collections::BTreeSet;

use rollcall::{FailureConfiguration, Processor, SimulationConfig, Simulator};

/// With a failure chance of 1.0 the injector fires as soon as the gap
/// allows, so the failure schedule is exact: one victim at cycles 11, 22
/// and 33, after which only two processors remain alive and injection
/// stops for good.
#[test]
fn failure_schedule_respects_gap_and_minimum_live_count() {
    let config = SimulationConfig {
        num_processors: 5,
        period: 20,
        failure: Some(FailureConfiguration {
            gap: 10,
            chance: 1.0,
        }),
        ..SimulationConfig::default()
    };
    let mut sim = Simulator::attendance(&config).expect("valid configuration");

    let mut failures_at = Vec::new();
    let mut prev = 0;
    for _ in 0..120 {
        sim.advance_cycle().expect("no protocol errors");
        let count = sim.network().failed().len();
        assert!(count <= prev + 1, "failed set grew by more than one in a cycle");
        if count > prev {
            failures_at.push(sim.current_cycle() - 1);
        }
        prev = count;
    }

    assert_eq!(failures_at, vec![11, 22, 33]);
    assert_eq!(sim.network().failed().len(), 3);
}

/// Failed processors never send again: their queued output is not collected
/// and the protocol hears from them only through messages already in flight.
/// The survivors keep reforming rings that reference live processors only.
#[test]
fn survivors_only_reference_live_processors() {
    let config = SimulationConfig {
        num_processors: 5,
        period: 20,
        seed: 3,
        failure: Some(FailureConfiguration {
            gap: 10,
            chance: 1.0,
        }),
        ..SimulationConfig::default()
    };
    let mut sim = Simulator::attendance(&config).expect("valid configuration");
    sim.run(400).expect("no protocol errors");

    let failed: BTreeSet<usize> = sim.network().failed().iter().copied().collect();
    assert_eq!(failed.len(), 3);

    for proc in sim.processors() {
        if failed.contains(&proc.id()) {
            continue;
        }
        let members = proc.members();
        assert!(
            members.contains(&proc.id()),
            "live processor {} missing from its own list {:?}",
            proc.id(),
            members
        );
        for member in members {
            assert!(
                !failed.contains(member),
                "live processor {} still lists failed processor {}",
                proc.id(),
                member
            );
        }
    }
}

/// Absent failure configuration means no failure is ever injected.
#[test]
fn no_failures_without_configuration() {
    let config = SimulationConfig {
        num_processors: 4,
        ..SimulationConfig::default()
    };
    let mut sim = Simulator::attendance(&config).expect("valid configuration");
    sim.run(200).expect("no protocol errors");
    assert!(sim.network().failed().is_empty());
}
