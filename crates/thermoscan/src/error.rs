//! Error types for the thermoscan library.

use thiserror::Error;

/// Result type alias for thermoscan operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while assembling analysis inputs.
///
/// Rejected candidates and non-converging registration are normal pipeline
/// outcomes, not errors. The only fallible surface is dimension consistency
/// of the caller-supplied buffers.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Frame with a zero dimension.
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    /// Channel plane whose length disagrees with the frame dimensions.
    #[error("channel plane holds {len} samples, expected {expected} for a {width}x{height} frame")]
    PlaneSizeMismatch {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}
