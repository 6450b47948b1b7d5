//! One uniform buffer and descriptor set per frame in flight.

use std::marker::PhantomData;
use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;
use tracing::debug;

use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_rhi::descriptor::{
    DescriptorPool, DescriptorSetLayout, uniform_buffer_binding, uniform_pool_size,
    write_uniform_buffer,
};
use ember_rhi::device::Device;
use ember_rhi::{MAX_FRAMES_IN_FLIGHT, RhiResult};

/// Stages that read the global set.
pub const GLOBAL_SET_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

/// Host-visible `T` slots bound at set 0, binding 0.
///
/// Slot `i` is only written while frame slot `i` is being recorded, after
/// its fence has been waited on in acquire, so the GPU never reads a slot
/// the CPU is writing.
pub struct UniformRing<T: Pod> {
    buffers: Vec<Buffer>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    // Sets are released with the pool
    _pool: DescriptorPool,
    layout: DescriptorSetLayout,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformRing<T> {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let size = std::mem::size_of::<T>() as vk::DeviceSize;

        let buffers = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| Buffer::new(device.clone(), BufferUsage::Uniform, size))
            .collect::<RhiResult<Vec<_>>>()?;

        let layout = DescriptorSetLayout::new(
            device.clone(),
            &[uniform_buffer_binding(0, GLOBAL_SET_STAGES)],
        )?;

        let pool = DescriptorPool::new(
            device.clone(),
            MAX_FRAMES_IN_FLIGHT as u32,
            &[uniform_pool_size(MAX_FRAMES_IN_FLIGHT as u32)],
        )?;

        let descriptor_sets = pool.allocate(&[layout.handle(); MAX_FRAMES_IN_FLIGHT])?;
        for (set, buffer) in descriptor_sets.iter().zip(&buffers) {
            write_uniform_buffer(&device, *set, 0, buffer.handle());
        }

        debug!(
            "Created uniform ring: {} slot(s) of {} bytes",
            MAX_FRAMES_IN_FLIGHT, size
        );

        Ok(Self {
            buffers,
            descriptor_sets,
            _pool: pool,
            layout,
            _marker: PhantomData,
        })
    }

    /// Copies `value` into slot `frame_index`.
    ///
    /// # Panics
    ///
    /// Panics if `frame_index >= MAX_FRAMES_IN_FLIGHT`.
    pub fn write(&self, frame_index: usize, value: &T) -> RhiResult<()> {
        self.buffers[frame_index].write_pod(value)
    }

    #[inline]
    pub fn descriptor_set(&self, frame_index: usize) -> vk::DescriptorSet {
        self.descriptor_sets[frame_index]
    }

    /// Layout every render system's pipeline layout takes as set 0.
    #[inline]
    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_set_stages() {
        assert!(GLOBAL_SET_STAGES.contains(vk::ShaderStageFlags::VERTEX));
        assert!(GLOBAL_SET_STAGES.contains(vk::ShaderStageFlags::FRAGMENT));
        assert!(!GLOBAL_SET_STAGES.contains(vk::ShaderStageFlags::COMPUTE));
    }
}
