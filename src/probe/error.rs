use super::{ProbeId, ProbeState};
use crate::firmware::{ProbePointId, ProbeType};
use thiserror::Error;

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Failure reported by the probe driver itself
    #[error("{0}")]
    Driver(String),

    #[error("Unable to get state from driver: {0}")]
    StateRead(String),

    #[error("Unable to set state to driver: {0}")]
    StateWrite(String),

    #[error("Unexpected driver probe service state: {0}")]
    UnexpectedState(ProbeState),

    #[error("Invalid probe index: {0}")]
    InvalidProbeIndex(usize),

    #[error("Expected to receive {expected} probe configurations to set. (Actually received {actual})")]
    ProbeCount { expected: usize, actual: usize },

    #[error("Probe configuration cannot change while the probe service is active")]
    ConfigWhileActive,

    #[error("Exceed max extraction probes supported: {0}")]
    TooManyExtractionProbes(usize),

    #[error("Exceed max injection probes supported: {0}")]
    TooManyInjectionProbes(usize),

    #[error("Unknown probe id: {0}")]
    UnknownProbe(ProbeId),

    #[error("Wrong probe id: {0}")]
    WrongProbe(ProbeId),

    #[error("Two active extraction probes have the same probe point id: {0}")]
    DuplicateProbePoint(ProbePointId),

    #[error("Sample byte size not found for injection probe id {0}")]
    MissingSampleSize(ProbeId),

    #[error("Sample byte size must be greater than 0 for injection probe id {0}")]
    ZeroSampleSize(ProbeId),

    #[error("Unsupported pin type: {0}")]
    UnsupportedPinType(ProbeType),

    #[error("Invalid pin index: {index} max: {count}")]
    InvalidPinIndex { index: u32, count: usize },

    #[error("Unsupported format bit depth: {0} (should be a multiple of 8)")]
    UnsupportedBitDepth(u32),

    /// A streaming worker stopped on an error
    #[error("Aborting probe {worker} due to: {reason}")]
    WorkerAborted { worker: &'static str, reason: String },
}

impl ProbeError {
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }
}
