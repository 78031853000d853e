use crate::clock::Cycle;
use crate::error::{SimulationError, SimulationResult};

/// Configuration for a simulation run.
///
/// Latencies and the token period are expressed in cycles and must be at
/// least 1. A `failure` of `None` means no processor failures are ever
/// injected.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of processors in the simulation. Must be at least 2.
    pub num_processors: usize,
    /// Delivery latency of point-to-point messages, in cycles.
    pub datagram_latency: Cycle,
    /// Delivery latency of broadcast messages, in cycles.
    pub broadcast_latency: Cycle,
    /// Expected interval of one full token circulation, in cycles.
    pub period: Cycle,
    /// Seed for the network's random number generator.
    pub seed: u64,
    /// Random processor failure injection. `None` disables failures.
    pub failure: Option<FailureConfiguration>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_processors: 3,
            datagram_latency: 2,
            broadcast_latency: 2,
            period: 10,
            seed: 0,
            failure: None,
        }
    }
}

impl SimulationConfig {
    /// Validates the configuration, returning the first violation found.
    pub fn validate(&self) -> SimulationResult<()> {
        if self.num_processors < 2 {
            return Err(SimulationError::NotEnoughProcessors(self.num_processors));
        }
        if self.datagram_latency == 0 || self.broadcast_latency == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "message latencies must be at least 1 cycle".to_string(),
            ));
        }
        if self.period == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "token period must be at least 1 cycle".to_string(),
            ));
        }
        if let Some(failure) = &self.failure {
            if !(0.0..=1.0).contains(&failure.chance) {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "failure chance must be within [0, 1], got {}",
                    failure.chance
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for random processor failure injection.
#[derive(Debug, Clone)]
pub struct FailureConfiguration {
    /// Minimum number of cycles between two injected failures.
    pub gap: Cycle,
    /// Per-cycle probability of injecting a failure (0.0 - 1.0).
    pub chance: f64,
}

impl Default for FailureConfiguration {
    fn default() -> Self {
        Self {
            gap: 10,
            chance: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_fewer_than_two_processors() {
        let config = SimulationConfig {
            num_processors: 1,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimulationError::NotEnoughProcessors(1))
        );
    }

    #[test]
    fn rejects_zero_latency_and_period() {
        let config = SimulationConfig {
            datagram_latency: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfiguration(_))
        ));

        let config = SimulationConfig {
            period: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_failure_chance() {
        let config = SimulationConfig {
            failure: Some(FailureConfiguration {
                gap: 5,
                chance: 1.5,
            }),
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }
}
