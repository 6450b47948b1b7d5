//! Vulkan logical device and queue management.
//!
//! [`Device`] is the capability object everything above the RHI talks to:
//! queues, the gpu-allocator instance, a one-shot upload path
//! ([`Device::copy_buffer`]), format queries and `wait_idle`.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, error, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, required_device_extensions};

/// Vulkan logical device wrapper.
///
/// Shared as `Arc<Device>`. The allocator and the upload command pool are
/// behind mutexes; everything else is immutable after creation.
pub struct Device {
    instance: ash::Instance,
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    allocator: ManuallyDrop<Mutex<Allocator>>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilyIndices,
    /// Transient pool used for one-shot transfers.
    upload_pool: Mutex<vk::CommandPool>,
}

impl Device {
    /// Creates the logical device, its queues, the allocator and the upload pool.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> RhiResult<Arc<Self>> {
        let queue_families = physical_device_info.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(physical_device_info.features.sampler_anisotropy == vk::TRUE);

        let extension_names: Vec<*const std::ffi::c_char> = required_device_extensions()
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!("Logical device created");

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };
        debug!(
            "Queues retrieved (graphics family {}, present family {})",
            graphics_family, present_family
        );

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: physical_device_info.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })?;

        info!("GPU memory allocator initialized");

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);
        let upload_pool = unsafe { device.create_command_pool(&pool_info, None)? };

        Ok(Arc::new(Self {
            instance: instance.handle().clone(),
            device,
            physical_device: physical_device_info.device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            present_queue,
            queue_families,
            upload_pool: Mutex::new(upload_pool),
        }))
    }

    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Queue used for both graphics submission and one-shot transfers.
    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// GPU memory allocator, locked per allocation.
    #[inline]
    pub fn allocator(&self) -> &Mutex<Allocator> {
        &self.allocator
    }

    /// Block until every queue on the device is idle.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submit to the graphics queue.
    ///
    /// # Safety
    ///
    /// Command buffers must be fully recorded and `fence` must be unsignaled
    /// and not pending.
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> RhiResult<()> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)?;
        }
        Ok(())
    }

    /// Copy `size` bytes from `src` to `dst` and wait for completion.
    ///
    /// Used for staging uploads; blocks on the graphics queue.
    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) -> RhiResult<()> {
        self.one_shot(|device, cmd| {
            let region = vk::BufferCopy::default().size(size);
            unsafe { device.cmd_copy_buffer(cmd, src, dst, &[region]) };
        })
    }

    /// Record `record` into a transient command buffer, submit it and wait.
    fn one_shot(&self, record: impl FnOnce(&ash::Device, vk::CommandBuffer)) -> RhiResult<()> {
        let pool = self.upload_pool.lock().unwrap();

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = unsafe { self.device.allocate_command_buffers(&alloc_info)? }[0];

        let result = (|| -> RhiResult<()> {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            unsafe { self.device.begin_command_buffer(cmd, &begin_info)? };
            record(&self.device, cmd);
            unsafe { self.device.end_command_buffer(cmd)? };

            let buffers = [cmd];
            let submit = vk::SubmitInfo::default().command_buffers(&buffers);
            unsafe {
                self.device
                    .queue_submit(self.graphics_queue, &[submit], vk::Fence::null())?;
                self.device.queue_wait_idle(self.graphics_queue)?;
            }
            Ok(())
        })();

        unsafe { self.device.free_command_buffers(*pool, &[cmd]) };
        result
    }

    /// First format in `candidates` supporting `features` with `tiling`.
    pub fn find_supported_format(
        &self,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> RhiResult<vk::Format> {
        candidates
            .iter()
            .copied()
            .find(|&format| {
                let props = unsafe {
                    self.instance
                        .get_physical_device_format_properties(self.physical_device, format)
                };
                let supported = match tiling {
                    vk::ImageTiling::LINEAR => props.linear_tiling_features,
                    _ => props.optimal_tiling_features,
                };
                supported.contains(features)
            })
            .ok_or_else(|| {
                RhiError::SwapchainError(format!("None of {:?} supports {:?}", candidates, features))
            })
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle during drop: {:?}", e);
            }

            if let Ok(pool) = self.upload_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // The allocator frees its memory blocks through the device, so it
            // has to go before the device itself.
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// SAFETY: ash::Device and ash::Instance are Send + Sync; the raw handles are
// plain values; the allocator and upload pool are behind mutexes.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }

    #[test]
    fn test_swapchain_extension_required() {
        assert!(required_device_extensions().contains(&ash::khr::swapchain::NAME));
    }
}
