//! Per-frame global uniform block.
//!
//! These structures must match the GLSL `GlobalUbo` block in the shaders
//! exactly. All structures use `#[repr(C)]` and implement `Pod` so they can
//! be copied straight into a host-visible buffer.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Capacity of [`GlobalUbo::point_lights`].
pub const MAX_LIGHTS: usize = 10;

/// One point light as seen by the shaders.
///
/// # Memory Layout
///
/// - Offset 0: position (w ignored)
/// - Offset 16: color (w is intensity)
/// - Total size: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    pub position: Vec4,
    pub color: Vec4,
}

/// Global uniform data bound at set 0, binding 0.
///
/// # Memory Layout
///
/// - Offset 0: projection matrix (64 bytes)
/// - Offset 64: view matrix (64 bytes)
/// - Offset 128: inverse view matrix (64 bytes)
/// - Offset 192: ambient light color, w is intensity (16 bytes)
/// - Offset 208: point lights (10 * 32 bytes)
/// - Offset 528: active light count (4 bytes)
/// - Offset 532: padding (12 bytes)
/// - Total size: 544 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlobalUbo {
    pub projection: Mat4,
    pub view: Mat4,
    /// Used by the billboard shader to recover the camera's right and up.
    pub inverse_view: Mat4,
    pub ambient_light_color: Vec4,
    pub point_lights: [PointLight; MAX_LIGHTS],
    /// Number of valid entries at the front of `point_lights`.
    pub num_lights: i32,
    pub _padding: [i32; 3],
}

impl Default for GlobalUbo {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            ambient_light_color: Vec4::new(1.0, 1.0, 1.0, 0.02),
            point_lights: [PointLight::default(); MAX_LIGHTS],
            num_lights: 0,
            _padding: [0; 3],
        }
    }
}

impl GlobalUbo {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// The lights that are currently active.
    pub fn active_lights(&self) -> &[PointLight] {
        let count = (self.num_lights.max(0) as usize).min(MAX_LIGHTS);
        &self.point_lights[..count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_point_light_size() {
        assert_eq!(std::mem::size_of::<PointLight>(), 32);
    }

    #[test]
    fn test_global_ubo_size() {
        assert_eq!(GlobalUbo::SIZE, 544);
        assert_eq!(GlobalUbo::SIZE % 16, 0);
    }

    #[test]
    fn test_global_ubo_offsets() {
        assert_eq!(offset_of!(GlobalUbo, inverse_view), 128);
        assert_eq!(offset_of!(GlobalUbo, ambient_light_color), 192);
        assert_eq!(offset_of!(GlobalUbo, point_lights), 208);
        assert_eq!(offset_of!(GlobalUbo, num_lights), 528);
    }

    #[test]
    fn test_global_ubo_default() {
        let ubo = GlobalUbo::default();
        assert_eq!(ubo.projection, Mat4::IDENTITY);
        assert_eq!(ubo.ambient_light_color, Vec4::new(1.0, 1.0, 1.0, 0.02));
        assert_eq!(ubo.num_lights, 0);
        assert!(ubo.active_lights().is_empty());
    }

    #[test]
    fn test_active_lights() {
        let mut ubo = GlobalUbo::default();
        ubo.point_lights[0].color = Vec4::ONE;
        ubo.num_lights = 1;
        assert_eq!(ubo.active_lights().len(), 1);
        assert_eq!(ubo.active_lights()[0].color, Vec4::ONE);
    }

    #[test]
    fn test_ubo_pod() {
        let ubo = GlobalUbo::default();
        let bytes: &[u8] = bytemuck::bytes_of(&ubo);
        assert_eq!(bytes.len(), GlobalUbo::SIZE);
    }
}
