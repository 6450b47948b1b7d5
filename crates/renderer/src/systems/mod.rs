//! Render systems.
//!
//! Each system owns one pipeline and its layout, built against the swap
//! chain render pass with the global descriptor set layout at set 0.

mod mesh_render_system;
mod point_light_system;

pub use mesh_render_system::{MeshPushConstants, MeshRenderSystem};
pub use point_light_system::{
    ORBIT_AXIS, PointLightPushConstants, PointLightSystem, update_point_lights,
};

use crate::frame_info::FrameInfo;
use crate::ubo::GlobalUbo;

/// A per-frame participant in the render loop.
///
/// `update` runs for every system before the global uniform block is
/// uploaded; `render` runs inside the swap chain render pass.
pub trait RenderSystem {
    fn update(&self, _frame_info: &mut FrameInfo<'_>, _ubo: &mut GlobalUbo) {}

    fn render(&self, frame_info: &FrameInfo<'_>);
}
