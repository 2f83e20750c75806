use crate::shared_data::IntersectionId;
use thiserror::Error;

/// Failures reported by a [`SimulationAdapter`](crate::simulation_engine::adapter::SimulationAdapter).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("intersection {0} is unknown to the simulation")]
    UnknownIntersection(IntersectionId),

    #[error("lane {0} does not exist")]
    UnknownLane(String),

    #[error("phase {index} is outside the program of {intersection} ({len} phases)")]
    PhaseOutOfRange {
        intersection: IntersectionId,
        index: usize,
        len: usize,
    },

    #[error("simulation refused command for {intersection}: {reason}")]
    Rejected {
        intersection: IntersectionId,
        reason: String,
    },
}

/// Error taxonomy of the signal-control engine.
///
/// Only [`SignalError::NoValidControllers`] and the configuration variants are
/// ever returned to a caller. The remaining variants are logged and absorbed at
/// the component boundary where they occur.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("could not resolve phase topology for {intersection}: {reason}")]
    ResolutionFailure {
        intersection: IntersectionId,
        reason: String,
    },

    #[error("phase command {phase} rejected at {intersection}: {source}")]
    TransitionRejected {
        intersection: IntersectionId,
        phase: usize,
        #[source]
        source: AdapterError,
    },

    #[error("detector lane {lane} unreadable: {source}")]
    SensorReadFailure {
        lane: String,
        #[source]
        source: AdapterError,
    },

    #[error("coordination of group {group} failed: {reason}")]
    CoordinationError { group: String, reason: String },

    #[error("no valid signal controllers after phase resolution")]
    NoValidControllers,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = SignalError> = std::result::Result<T, E>;
