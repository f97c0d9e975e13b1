//! Error types for GPU compute.

use thiserror::Error;

/// Error type for GPU setup and dispatch.
#[derive(Error, Debug)]
pub enum ComputeError {
    /// No suitable GPU adapter was found.
    #[error("no GPU adapter available")]
    NoAdapter,

    /// Device creation failed.
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    /// A dispatch or readback failed.
    #[error("GPU operation failed: {0}")]
    OperationFailed(String),

    /// The GPU path is compiled out or disabled.
    #[error("GPU backend not available: {0}")]
    BackendNotAvailable(String),
}

/// Result type for compute operations.
pub type ComputeResult<T> = Result<T, ComputeError>;
