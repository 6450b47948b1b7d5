//! Synchronization primitives.
//!
//! - [`Semaphore`]: GPU-to-GPU ordering between queue operations
//! - [`Fence`]: GPU-to-CPU completion signal
//! - [`FrameSync`]: the per frame-in-flight triple used by the swap chain

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan semaphore wrapper, created unsignaled.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Vulkan fence wrapper.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a fence, optionally already signaled so the first wait on it
    /// returns immediately.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );

        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Block until the fence is signaled. `timeout` is in nanoseconds.
    pub fn wait(&self, timeout: u64) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .wait_for_fences(&[self.fence], true, timeout)?
        };
        Ok(())
    }

    /// Return the fence to the unsignaled state. It must not be pending.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe { self.device.handle().reset_fences(&[self.fence])? };
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
        debug!("Destroyed fence");
    }
}

/// Synchronization for one frame-in-flight slot.
///
/// ```text
/// acquire  -> signals image_available
/// submit   -> waits image_available, signals render_finished + in_flight
/// present  -> waits render_finished
/// ```
pub struct FrameSync {
    image_available: Semaphore,
    render_finished: Semaphore,
    in_flight: Fence,
}

impl FrameSync {
    /// The fence starts signaled so the first frame does not block.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device, true)?,
        })
    }

    #[inline]
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    #[inline]
    pub fn render_finished(&self) -> &Semaphore {
        &self.render_finished
    }

    #[inline]
    pub fn in_flight(&self) -> &Fence {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
        assert_send_sync::<Fence>();
        assert_send_sync::<FrameSync>();
    }
}
