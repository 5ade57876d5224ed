//! Engine error types.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The requested feature or codec is not available on this host.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// Empty, malformed, wrong-artifact-type, or sanity-check failure.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required parallel backend is absent and no fallback exists.
    #[error("Accelerator unavailable: {0}")]
    AcceleratorUnavailable(String),

    /// Not enough memory to run the operation.
    #[error("Insufficient memory: need {needed_mb} MB, ceiling is {ceiling_mb} MB")]
    InsufficientMemory {
        /// Memory the operation would need, in MB.
        needed_mb: usize,
        /// Configured ceiling, in MB.
        ceiling_mb: usize,
    },

    /// The operation exceeded the caller-supplied timeout.
    #[error("Processing timed out after {0:?}")]
    ProcessingTimeout(Duration),

    /// A post-encode fidelity measurement fell below the required floor.
    #[error("Quality threshold not met: expected {expected:.1} dB, measured {actual:.1} dB")]
    QualityThresholdNotMet {
        /// Minimum acceptable score.
        expected: f64,
        /// Score actually measured.
        actual: f64,
    },

    /// Payload larger than the codec can carry.
    #[error("Capacity exceeded: need <= {maximum} bytes, got {requested}")]
    CapacityExceeded {
        /// Bytes the caller asked to encode.
        requested: usize,
        /// Maximum the codec supports.
        maximum: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure (task join, image re-encode, ...).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;
