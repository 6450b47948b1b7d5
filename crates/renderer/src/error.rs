//! Error types for frame orchestration and render systems.

use ember_resources::ResourceError;
use ember_rhi::RhiError;
use thiserror::Error;

/// Error type for renderer operations.
#[derive(Error, Debug)]
pub enum RendererError {
    /// Acquiring the next swap chain image failed for a reason other than
    /// the chain being out of date.
    #[error("Acquire failed: {0}")]
    Acquire(#[source] RhiError),

    /// Submission or presentation failed for a reason other than the chain
    /// being out of date or suboptimal.
    #[error("Present failed: {0}")]
    Present(#[source] RhiError),

    /// The surface was closed before it ever had a drawable extent.
    #[error("Surface closed before a swap chain could be created")]
    SurfaceClosed,

    #[error(transparent)]
    Rhi(#[from] RhiError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Result type alias for renderer operations.
pub type RendererResult<T> = Result<T, RendererError>;
