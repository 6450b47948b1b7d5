//! Error types shared by the engine crates.

use thiserror::Error;

/// Engine-level error.
///
/// Lower layers carry their own error enums (`RhiError`, `ResourceError`);
/// this one covers the cross-cutting cases the application deals with.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan-related errors
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or event loop errors
    #[error("Window error: {0}")]
    Window(String),

    /// Asset loading errors
    #[error("Resource error: {0}")]
    Resource(String),

    /// Shader loading errors
    #[error("Shader error: {0}")]
    Shader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias using the engine's Error type.
pub type Result<T> = std::result::Result<T, Error>;
