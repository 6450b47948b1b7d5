//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate.
//! It handles:
//! - Instance, physical device and logical device creation
//! - Swap chain, render pass and framebuffer management
//! - Command buffer recording
//! - Buffer allocation through gpu-allocator
//! - Pipeline and descriptor creation
//! - Synchronization primitives

mod error;

pub mod buffer;
pub mod command;
pub mod depth;
pub mod descriptor;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};
pub use swapchain::{MAX_FRAMES_IN_FLIGHT, SwapStatus};

// Re-export ash types that users might need
pub use ash::vk;
