//! Platform layer for the ember renderer.
//!
//! This crate provides:
//! - A winit window with an explicitly pumped event loop
//! - Vulkan surface creation via ash-window
//! - Keyboard input state
//! - The [`PresentationSurface`] contract the renderer polls

mod input;
mod surface;
mod window;

pub use input::{InputState, KeyCode};
pub use surface::{PresentationSurface, is_degenerate};
pub use window::{Surface, Window};
