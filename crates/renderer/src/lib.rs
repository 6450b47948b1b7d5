//! Frame orchestration and render systems.
//!
//! This crate drives the frame loop:
//! - [`Renderer`] acquires, records, submits and presents frames and
//!   rebuilds the swap chain when it goes stale
//! - [`UniformRing`] holds the per-frame [`GlobalUbo`] slots
//! - [`MeshRenderSystem`] and [`PointLightSystem`] record the scene
//!
//! The renderer reaches the device only through [`FrameBackend`];
//! [`VulkanBackend`] is the implementation used by the application.

pub mod backend;
mod error;
pub mod frame_info;
pub mod renderer;
pub mod systems;
pub mod ubo;
pub mod uniform_ring;
pub mod vulkan;

pub use backend::{FrameBackend, PresentChain};
pub use error::{RendererError, RendererResult};
pub use frame_info::FrameInfo;
pub use renderer::{DEFAULT_CLEAR_COLOR, Renderer};
pub use systems::{MeshRenderSystem, PointLightSystem, RenderSystem};
pub use ubo::{GlobalUbo, MAX_LIGHTS, PointLight};
pub use uniform_ring::UniformRing;
pub use vulkan::VulkanBackend;

pub use ember_rhi::{MAX_FRAMES_IN_FLIGHT, SwapStatus};
