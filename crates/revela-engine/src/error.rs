//! The engine error taxonomy.
//!
//! Recovery policy, not just classification:
//!
//! - [`EngineError::Decode`] is non-retryable and always surfaces
//! - [`EngineError::Kernel`] surfaces only after the CPU fallback also
//!   failed (GPU failures are retried on the CPU before reaching here)
//! - [`EngineError::OutOfMemory`] is a detectable state — the engine
//!   downgrades the preview resolution and evicts before retrying
//! - cache validity failures never surface at all; they are treated as
//!   misses and recomputed silently

use revela_params::ProcessingStage;
use thiserror::Error;

/// Error type for render orchestration.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The source could not be decoded. Non-retryable.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A numeric kernel failed after all fallbacks.
    #[error("kernel failure in {stage} stage: {message}")]
    Kernel {
        /// The stage whose kernel failed.
        stage: ProcessingStage,
        /// What went wrong.
        message: String,
    },

    /// Working memory could not be allocated for the render.
    #[error("out of memory during render")]
    OutOfMemory,

    /// The render was superseded by a newer edit and stopped early.
    #[error("render cancelled")]
    Cancelled,

    /// No source image has been loaded.
    #[error("no source image loaded")]
    NoSource,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
