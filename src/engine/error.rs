//! Engine error type

use thiserror::Error;

use super::transport::TransportError;
use crate::synth::PitchError;

/// Errors reported by engine control and lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("oscillator index {index} out of range ({count} oscillators)")]
    OscillatorOutOfRange { index: usize, count: usize },

    #[error("invalid note: {0}")]
    Pitch(#[from] PitchError),

    #[error("audio transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("engine has been shut down")]
    ShutDown,
}

/// Convenience result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
