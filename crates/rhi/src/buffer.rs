//! GPU buffer management.
//!
//! [`Buffer`] wraps a `VkBuffer` whose memory comes from gpu-allocator.
//! Vertex and index buffers live in device-local memory and are filled
//! through a [`BufferUsage::Staging`] buffer plus [`Device::copy_buffer`];
//! uniform and staging buffers are host-visible and written directly.

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// How a buffer will be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
    Staging,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    pub fn memory_location(self) -> MemoryLocation {
        match self {
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::GpuOnly,
            // Rewritten every frame
            BufferUsage::Uniform => MemoryLocation::CpuToGpu,
            BufferUsage::Staging => MemoryLocation::CpuToGpu,
        }
    }

    /// Whether the CPU can write the buffer through a mapped pointer.
    pub fn is_host_visible(self) -> bool {
        self.memory_location() != MemoryLocation::GpuOnly
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
        }
    }
}

/// A GPU buffer with allocator-managed memory.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates an uninitialized buffer of `size` bytes.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::BufferError(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: usage.memory_location(),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
        };
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        })
    }

    /// Creates a device-local buffer and fills it through a staging copy.
    pub fn new_device_local(
        device: Arc<Device>,
        usage: BufferUsage,
        data: &[u8],
    ) -> RhiResult<Self> {
        let staging = Self::new(device.clone(), BufferUsage::Staging, data.len() as vk::DeviceSize)?;
        staging.write_data(0, data)?;

        let buffer = Self::new(device.clone(), usage, data.len() as vk::DeviceSize)?;
        device.copy_buffer(staging.handle(), buffer.handle(), buffer.size())?;

        Ok(buffer)
    }

    /// Copy bytes into a host-visible buffer at `offset`.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        check_write_range(offset, data.len(), self.size)?;

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            RhiError::BufferError("Buffer allocation is not available".to_string())
        })?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| RhiError::BufferError(format!("{} buffer is not mapped", self.usage.name())))?;

        // SAFETY: the range was checked against the buffer size and the
        // allocation stays mapped for its whole lifetime.
        unsafe {
            let dst = mapped_ptr.as_ptr().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst as *mut u8, data.len());
        }

        Ok(())
    }

    /// Write one plain-old-data value at offset 0.
    pub fn write_pod<T: Pod>(&self, value: &T) -> RhiResult<()> {
        self.write_data(0, bytemuck::bytes_of(value))
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

fn check_write_range(offset: vk::DeviceSize, len: usize, size: vk::DeviceSize) -> RhiResult<()> {
    let end = offset + len as vk::DeviceSize;
    if end > size {
        return Err(RhiError::BufferError(format!(
            "Write exceeds buffer size: offset {} + data {} > buffer {}",
            offset, len, size
        )));
    }
    Ok(())
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self.device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free buffer allocation: {:?}", e);
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_flags() {
        assert!(
            BufferUsage::Vertex
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert!(
            BufferUsage::Index
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::INDEX_BUFFER)
        );
        assert!(
            BufferUsage::Uniform
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::UNIFORM_BUFFER)
        );
        assert_eq!(
            BufferUsage::Staging.to_vk_usage(),
            vk::BufferUsageFlags::TRANSFER_SRC
        );
    }

    #[test]
    fn test_geometry_is_device_local() {
        assert!(!BufferUsage::Vertex.is_host_visible());
        assert!(!BufferUsage::Index.is_host_visible());
        assert!(BufferUsage::Uniform.is_host_visible());
        assert!(BufferUsage::Staging.is_host_visible());
    }

    #[test]
    fn test_write_range_check() {
        assert!(check_write_range(0, 64, 64).is_ok());
        assert!(check_write_range(32, 32, 64).is_ok());
        assert!(matches!(
            check_write_range(33, 32, 64),
            Err(RhiError::BufferError(_))
        ));
    }

    #[test]
    fn test_buffer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Buffer>();
    }
}
