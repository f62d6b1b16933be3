//! Errors raised while setting up a simulation.
//!
//! Once an engine is constructed the simulation itself never fails: missing data turns into
//! terminal car states and invalid player commands are rejected with `false`.

use thiserror::Error;

/// Result type alias for engine construction and input parsing.
pub type Result<T, E = RacesimError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RacesimError {
    #[error("race dataset contains no drivers")]
    EmptyDataset,

    #[error("player driver '{0}' is not part of the race dataset")]
    UnknownPlayer(String),

    #[error("driver '{0}' has no telemetry samples")]
    EmptyTelemetry(String),

    #[error("driver '{0}' has no lap records")]
    NoLapRecords(String),

    #[error("unknown tire compound '{0}'")]
    UnknownCompound(String),

    #[error("unknown drive mode '{0}', expected PUSH, NORMAL or CONSERVE")]
    UnknownMode(String),

    #[error("invalid strategy call '{0}', expected <LAP>:<VALUE>")]
    InvalidStrategyCall(String),

    #[error("invalid simulation constant: {0}")]
    InvalidConstant(String),
}
