//! Error types for configuration, persistence and device dispatch.

use thiserror::Error;

use crate::grid::GridSize;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid {width}x{height} must be at least 8x8 and a multiple of the 8-cell dispatch tile")]
    GridSize { width: usize, height: usize },
    #[error("over-relaxation {0} outside [1, 1.99]")]
    OverRelaxation(f32),
    #[error("pressure relaxation {0} outside [0, 1]")]
    PressureRelaxation(f32),
    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },
    #[error("{name} = {value} must be finite and positive")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} = {value} must be finite and non-negative")]
    Negative { name: &'static str, value: f32 },
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("domain file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("domain data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("domain has {actual} cells, session grid needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("domain cell {index} has mask value {value}, expected 0 or 1")]
    InvalidMask { index: usize, value: i32 },
    #[error("domain cell ({i}, {j}) on the outer ring is fluid")]
    OpenBoundary { i: usize, j: usize },
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device grid {actual:?} does not match session grid {expected:?}")]
    GridMismatch { expected: GridSize, actual: GridSize },
    #[error("field upload has {actual} cells, device holds {expected}")]
    UploadSize { expected: usize, actual: usize },
    #[error("compute device failure: {0}")]
    Backend(String),
}

/// Umbrella error for session-level operations.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
