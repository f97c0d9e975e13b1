//! Error types for core buffer construction.

use thiserror::Error;

/// Error type for buffer construction and validation.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A channel plane does not match the image dimensions.
    #[error("plane size mismatch: expected {expected} samples, got {actual}")]
    PlaneSizeMismatch {
        /// Expected sample count (`width * height`).
        expected: usize,
        /// Actual sample count supplied.
        actual: usize,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
