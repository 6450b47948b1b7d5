//! Error types for resource loading.

use std::path::PathBuf;

use ember_rhi::RhiError;
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Failed to parse an OBJ file.
    #[error("Failed to load OBJ file '{path}': {message}")]
    ObjLoad {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Buffer creation or upload failed.
    #[error(transparent)]
    Rhi(#[from] RhiError),
}

/// Result type alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
