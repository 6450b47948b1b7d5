//! Mesh vertex layout and its Vulkan input descriptions.
//!
//! # Memory Layout
//!
//! [`Vertex`] is `#[repr(C)]` and tightly packed:
//! - Offset 0: position (12 bytes)
//! - Offset 12: color (12 bytes)
//! - Offset 24: normal (12 bytes)
//! - Offset 36: uv (8 bytes)
//! - Total size: 44 bytes
//!
//! # Shader Locations
//!
//! - location 0: position (vec3)
//! - location 1: color (vec3)
//! - location 2: normal (vec3)
//! - location 3: uv (vec2)

use std::hash::{Hash, Hasher};
use std::mem::offset_of;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Per-vertex data consumed by the mesh pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: Vec3,
    /// Vertex color, white when the source mesh has none.
    pub color: Vec3,
    /// Object-space normal.
    pub normal: Vec3,
    /// Texture coordinates.
    pub uv: Vec2,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Vec3, color: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            color,
            normal,
            uv,
        }
    }

    /// Returns the size of the vertex in bytes.
    #[inline]
    pub const fn size() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Binding 0, advanced per vertex.
    pub fn binding_descriptions() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: Self::size() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    pub fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        let attribute = |location: u32, format: vk::Format, offset: usize| {
            vk::VertexInputAttributeDescription {
                binding: 0,
                location,
                format,
                offset: offset as u32,
            }
        };

        vec![
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, color)),
            attribute(2, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
            attribute(3, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, uv)),
        ]
    }

    fn bits(&self) -> [u32; 11] {
        let mut out = [0u32; 11];
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(self));
        for (dst, src) in out.iter_mut().zip(floats) {
            *dst = src.to_bits();
        }
        out
    }
}

// Vertices are compared bit-for-bit so they can key the dedup map during
// mesh loading. `-0.0` and `0.0` are therefore distinct.
impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_vertex_size() {
        assert_eq!(Vertex::size(), 44);
    }

    #[test]
    fn test_vertex_offsets() {
        let attrs = Vertex::attribute_descriptions();
        let offsets: Vec<u32> = attrs.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 36]);

        let locations: Vec<u32> = attrs.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
        assert_eq!(attrs[3].format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn test_binding_description() {
        let bindings = Vertex::binding_descriptions();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[0].stride, 44);
        assert_eq!(bindings[0].input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_vertex_equality_and_hash() {
        let a = Vertex::new(Vec3::ONE, Vec3::ONE, Vec3::Y, Vec2::ZERO);
        let b = a;
        let c = Vertex::new(Vec3::ONE, Vec3::ONE, Vec3::Y, Vec2::new(0.5, 0.0));

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Vertex> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_vertex_pod() {
        let vertices = [Vertex::default(); 3];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 3 * 44);
    }
}
