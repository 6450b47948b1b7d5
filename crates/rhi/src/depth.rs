//! Depth attachments for the swap chain framebuffers.
//!
//! One [`DepthImage`] is created per swap-chain image. Memory is GPU-only
//! and managed by gpu-allocator.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Depth formats tried in order when creating a swap chain.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Picks the first candidate usable as an optimal-tiling depth attachment.
pub fn find_depth_format(device: &Device) -> RhiResult<vk::Format> {
    device.find_supported_format(
        &DEPTH_FORMAT_CANDIDATES,
        vk::ImageTiling::OPTIMAL,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
    )
}

/// Image, view and allocation of a single depth attachment.
///
/// Destroyed in order: view, image, allocation.
pub struct DepthImage {
    device: Arc<Device>,
    image: vk::Image,
    image_view: vk::ImageView,
    allocation: Option<Allocation>,
    format: vk::Format,
}

impl DepthImage {
    /// # Errors
    ///
    /// Returns an error for a zero-sized extent, or if image creation,
    /// allocation or view creation fails.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D, format: vk::Format) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::SwapchainError(
                "Depth image dimensions must be greater than 0".to_string(),
            ));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: "swapchain_depth",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
        };
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e.into());
            }
        };

        unsafe {
            device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())?;
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let image_view = unsafe { device.handle().create_image_view(&view_info, None)? };

        debug!(
            "Created depth image: {}x{} ({:?})",
            extent.width, extent.height, format
        );

        Ok(Self {
            device,
            image,
            image_view,
            allocation: Some(allocation),
            format,
        })
    }

    #[inline]
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for DepthImage {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_image_view(self.image_view, None);
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self.device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                error!("Failed to free depth image allocation: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_candidates_prefer_d32() {
        assert_eq!(DEPTH_FORMAT_CANDIDATES[0], vk::Format::D32_SFLOAT);
        assert!(DEPTH_FORMAT_CANDIDATES.contains(&vk::Format::D24_UNORM_S8_UINT));
    }
}
