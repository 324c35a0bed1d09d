use thiserror::Error;

/// Errors that can occur while creating or driving a solver.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid grid dimensions {x}x{y}x{z} (minimum {min} per axis)")]
    InvalidDimensions { x: u32, y: u32, z: u32, min: u32 },

    #[error("failed to allocate {what} ({cells} cells)")]
    AllocationFailed { what: &'static str, cells: usize },

    #[error("GPU adapter not found: {0}")]
    AdapterNotFound(String),

    #[error("Failed to request GPU device: {0}")]
    DeviceRequestFailed(String),

    #[error("Shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    #[error("GPU readback failed: {0}")]
    ReadbackFailed(String),

    #[error("field length mismatch: expected {expected}, got {actual}")]
    FieldLengthMismatch { expected: usize, actual: usize },

    #[error("Failed to parse config RON: {0}")]
    ConfigParse(String),
}
