//! Descriptor set layouts, pools and uniform buffer writes.
//!
//! The renderer only binds one descriptor set per frame: the global set
//! holding the per-frame uniform buffer at binding 0. This module keeps the
//! Vulkan side of that small:
//! - [`DescriptorSetLayout`] wraps VkDescriptorSetLayout
//! - [`DescriptorPool`] allocates sets
//! - [`write_uniform_buffer`] points a set binding at a buffer

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan descriptor set layout wrapper.
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Creates a layout from the given bindings.
    ///
    /// # Errors
    ///
    /// Returns an error if layout creation fails.
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            bindings.len()
        );

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Descriptor set layout destroyed");
    }
}

/// Vulkan descriptor pool wrapper.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    /// Creates a pool able to hold `max_sets` sets drawn from `pool_sizes`.
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation fails.
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: max_sets={}, pool_sizes={}",
            max_sets,
            pool_sizes.len()
        );

        Ok(Self {
            device,
            pool,
            max_sets,
        })
    }

    /// Allocates one set per entry of `layouts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is exhausted.
    pub fn allocate(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> RhiResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };

        debug!("Allocated {} descriptor set(s)", sets.len());

        Ok(sets)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    #[inline]
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        // Sets allocated from the pool are released with it
        unsafe {
            self.device.handle().destroy_descriptor_pool(self.pool, None);
        }
        debug!("Descriptor pool destroyed");
    }
}

/// A uniform buffer binding with a single descriptor.
#[inline]
pub fn uniform_buffer_binding(
    binding: u32,
    stage_flags: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(stage_flags)
}

/// Pool sizing for `count` uniform buffer descriptors.
#[inline]
pub fn uniform_pool_size(count: u32) -> vk::DescriptorPoolSize {
    vk::DescriptorPoolSize::default()
        .ty(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(count)
}

#[inline]
pub fn buffer_info(
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    range: vk::DeviceSize,
) -> vk::DescriptorBufferInfo {
    vk::DescriptorBufferInfo::default()
        .buffer(buffer)
        .offset(offset)
        .range(range)
}

/// Points `binding` of `set` at the whole of `buffer`.
pub fn write_uniform_buffer(
    device: &Device,
    set: vk::DescriptorSet,
    binding: u32,
    buffer: vk::Buffer,
) {
    let infos = [buffer_info(buffer, 0, vk::WHOLE_SIZE)];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .dst_array_element(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&infos);

    unsafe {
        device.handle().update_descriptor_sets(&[write], &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_buffer_binding() {
        let binding = uniform_buffer_binding(
            0,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        );
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(binding.descriptor_count, 1);
        assert!(binding.stage_flags.contains(vk::ShaderStageFlags::VERTEX));
        assert!(binding.stage_flags.contains(vk::ShaderStageFlags::FRAGMENT));
    }

    #[test]
    fn test_uniform_pool_size() {
        let size = uniform_pool_size(2);
        assert_eq!(size.ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(size.descriptor_count, 2);
    }

    #[test]
    fn test_buffer_info_helper() {
        let info = buffer_info(vk::Buffer::null(), 64, 128);
        assert_eq!(info.buffer, vk::Buffer::null());
        assert_eq!(info.offset, 64);
        assert_eq!(info.range, 128);
    }
}
