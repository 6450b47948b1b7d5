//! RHI-specific error types.

use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    /// Failed to load the Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// A shader binary that does not exist on disk.
    #[error("File not found: {}", .0.display())]
    ShaderNotFound(PathBuf),

    /// A shader binary that exists but could not be read or is malformed.
    #[error("Shader error: {0}")]
    ShaderError(String),

    #[error("Surface error: {0}")]
    SurfaceError(String),

    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// A recreated swap chain came back with different attachment formats.
    #[error("Swap chain format changed: {old:?} -> {new:?}")]
    SwapchainFormatMismatch {
        old: (vk::Format, vk::Format),
        new: (vk::Format, vk::Format),
    },

    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Bad buffer size, out-of-range write or unmapped memory.
    #[error("Buffer error: {0}")]
    BufferError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

impl From<ember_core::Error> for RhiError {
    fn from(err: ember_core::Error) -> Self {
        RhiError::SurfaceError(err.to_string())
    }
}
