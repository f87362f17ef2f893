use crate::device::StorageDevice;
use crate::types::DType;
use thiserror::Error;

/// Custom error type for the ferrograd engine.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum FerrogradError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("DType mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    DtypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Device mismatch for operation '{operation}': expected {expected:?}, got {actual:?}")]
    DeviceMismatch {
        expected: StorageDevice,
        actual: StorageDevice,
        operation: String,
    },

    #[error("Operation '{operation}' expects {expected} inputs, got {actual}")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        operation: String,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Backward called on non-scalar variable of shape {shape:?} without a gradient seed")]
    MissingGradSeed { shape: Vec<usize> },

    #[error("Key '{0}' is not present")]
    MissingKey(String),

    #[error("Out of memory on {device:?}: requested {requested} bytes, {available} available")]
    ResourceExhausted {
        device: StorageDevice,
        requested: usize,
        available: usize,
    },

    #[error("Optimizer '{0}' does not support per-parameter updates; call update() instead")]
    InvalidUpdateCall(String),

    #[error("Value of variable {0} has been released")]
    ReleasedValue(String),

    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned while accessing {0}")]
    LockPoisoned(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for FerrogradError {
    fn from(err: std::io::Error) -> Self {
        FerrogradError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FerrogradError {
    fn from(err: serde_json::Error) -> Self {
        FerrogradError::Serialization(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FerrogradError>;
