use thiserror::Error;

/// Errors that can occur while building or running a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// A simulation needs at least two processors to form a ring.
    #[error("simulation requires at least 2 processors, got {0}")]
    NotEnoughProcessors(usize),
    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A protocol payload could not be parsed. This is a protocol violation,
    /// never an expected runtime condition, and aborts the processor step.
    #[error("malformed protocol message: {0:?}")]
    MalformedMessage(String),
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;
