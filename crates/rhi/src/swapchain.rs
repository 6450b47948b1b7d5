//! Swap chain management.
//!
//! A [`Swapchain`] owns everything whose lifetime follows the presentable
//! images: the VkSwapchainKHR itself, color image views, one depth image per
//! swap-chain image, the render pass, one framebuffer per image, and the
//! per-frame synchronization objects.
//!
//! # Frame Flow
//!
//! ```text
//! acquire_next_image   waits in_flight[current], signals image_available
//! submit_and_present   waits on the fence of whoever last used the image,
//!                      submits, presents, advances current frame
//! ```
//!
//! Recreation is done by building a new chain with the previous one passed
//! in, so the driver can recycle its images, and dropping the old one.

use std::sync::Arc;

use ash::vk;
use ember_platform::Surface;
use tracing::{debug, info, warn};

use crate::depth::{DepthImage, find_depth_format};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::sync::FrameSync;

/// Number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Outcome of an acquire or present that did not fail outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapStatus {
    Optimal,
    /// Presentation still works but the chain no longer matches the surface.
    Suboptimal,
    /// The chain can no longer be used and must be recreated.
    OutOfDate,
}

impl SwapStatus {
    /// Classifies the result of `vkAcquireNextImageKHR`.
    pub fn from_acquire(result: Result<(u32, bool), vk::Result>) -> RhiResult<(u32, Self)> {
        match result {
            Ok((index, false)) => Ok((index, Self::Optimal)),
            Ok((index, true)) => Ok((index, Self::Suboptimal)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok((0, Self::OutOfDate)),
            Err(e) => Err(RhiError::SwapchainError(format!(
                "failed to acquire swap chain image: {e}"
            ))),
        }
    }

    /// Classifies the result of `vkQueuePresentKHR`.
    pub fn from_present(result: Result<bool, vk::Result>) -> RhiResult<Self> {
        match result {
            Ok(false) => Ok(Self::Optimal),
            Ok(true) => Ok(Self::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(e) => Err(RhiError::SwapchainError(format!(
                "failed to present swap chain image: {e}"
            ))),
        }
    }
}

/// Surface capabilities, formats and present modes for one physical device.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// At least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Vulkan swap chain with its render pass, attachments and frame sync.
///
/// Not thread-safe; the renderer drives it from a single thread.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    depth_images: Vec<DepthImage>,
    framebuffers: Vec<vk::Framebuffer>,
    render_pass: vk::RenderPass,
    color_format: vk::Format,
    depth_format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    frames: Vec<FrameSync>,
    /// Fence of the frame slot that last rendered to each image, or null.
    images_in_flight: Vec<vk::Fence>,
    current_frame: usize,
}

impl Swapchain {
    /// Creates a swap chain sized for `window_extent`.
    ///
    /// When `previous` is given its handle is passed as `old_swapchain`; the
    /// caller drops the previous chain afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if surface queries fail, no depth format is
    /// supported, or any Vulkan object fails to create.
    pub fn new(
        device: Arc<Device>,
        surface: &Surface,
        window_extent: vk::Extent2D,
        previous: Option<&Swapchain>,
        prefer_mailbox: bool,
    ) -> RhiResult<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(device.instance(), device.handle());

        let support = SwapchainSupportDetails::query(
            device.physical_device(),
            surface.handle(),
            surface.loader(),
        )?;

        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes, prefer_mailbox);
        let extent = choose_extent(
            &support.capabilities,
            window_extent.width,
            window_extent.height,
        );
        let image_count = determine_image_count(&support.capabilities);
        let depth_format = find_depth_format(&device)?;

        info!(
            "Creating swapchain: {}x{}, format {:?}, depth {:?}, present mode {:?}, {} images",
            extent.width,
            extent.height,
            surface_format.format,
            depth_format,
            present_mode,
            image_count
        );

        let queue_families = device.queue_families();
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::SwapchainError(
                "Device has no graphics or present queue family".to_string(),
            ));
        };
        let queue_family_indices = [graphics_family, present_family];

        let (sharing_mode, queue_family_indices_slice) = if graphics_family != present_family {
            debug!(
                "Using CONCURRENT sharing mode between graphics ({}) and present ({}) queues",
                graphics_family, present_family
            );
            (vk::SharingMode::CONCURRENT, queue_family_indices.as_slice())
        } else {
            (vk::SharingMode::EXCLUSIVE, &[][..])
        };

        let old_swapchain = previous.map_or(vk::SwapchainKHR::null(), |chain| chain.swapchain);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices_slice)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        // From here on, Drop cleans up whatever has been created so far
        let mut chain = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            depth_images: Vec::new(),
            framebuffers: Vec::new(),
            render_pass: vk::RenderPass::null(),
            color_format: surface_format.format,
            depth_format,
            extent,
            present_mode,
            frames: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            images_in_flight: Vec::new(),
            current_frame: 0,
        };

        chain.images = unsafe { chain.swapchain_loader.get_swapchain_images(swapchain)? };
        chain.create_image_views()?;
        chain.create_render_pass()?;
        chain.create_depth_images()?;
        chain.create_framebuffers()?;
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            chain.frames.push(FrameSync::new(chain.device.clone())?);
        }
        chain.images_in_flight = vec![vk::Fence::null(); chain.images.len()];

        info!("Swapchain created with {} images", chain.images.len());
        Ok(chain)
    }

    fn create_image_views(&mut self) -> RhiResult<()> {
        for (i, &image) in self.images.iter().enumerate() {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.color_format)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            let view = unsafe {
                self.device
                    .handle()
                    .create_image_view(&create_info, None)
                    .map_err(|e| {
                        RhiError::SwapchainError(format!(
                            "Failed to create image view {}: {:?}",
                            i, e
                        ))
                    })?
            };
            self.image_views.push(view);
        }
        Ok(())
    }

    fn create_render_pass(&mut self) -> RhiResult<()> {
        let attachments = [
            vk::AttachmentDescription::default()
                .format(self.color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription::default()
                .format(self.depth_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)];

        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependencies = [vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        self.render_pass = unsafe { self.device.handle().create_render_pass(&create_info, None)? };
        debug!("Created swapchain render pass");
        Ok(())
    }

    fn create_depth_images(&mut self) -> RhiResult<()> {
        for _ in 0..self.images.len() {
            let depth = DepthImage::new(self.device.clone(), self.extent, self.depth_format)?;
            self.depth_images.push(depth);
        }
        Ok(())
    }

    fn create_framebuffers(&mut self) -> RhiResult<()> {
        for (view, depth) in self.image_views.iter().zip(&self.depth_images) {
            let attachments = [*view, depth.image_view()];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);

            let framebuffer =
                unsafe { self.device.handle().create_framebuffer(&create_info, None)? };
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    /// Waits for the current frame slot to retire, then acquires an image.
    ///
    /// # Errors
    ///
    /// Any acquire failure other than `ERROR_OUT_OF_DATE_KHR` is fatal.
    pub fn acquire_next_image(&self) -> RhiResult<(u32, SwapStatus)> {
        let frame = &self.frames[self.current_frame];
        frame.in_flight().wait(u64::MAX)?;

        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                frame.image_available().handle(),
                vk::Fence::null(),
            )
        };
        SwapStatus::from_acquire(result)
    }

    /// Submits `command_buffer` for `image_index` and queues it for
    /// presentation, then advances to the next frame slot.
    ///
    /// # Errors
    ///
    /// Submission failures and present failures other than out-of-date.
    pub fn submit_and_present(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> RhiResult<SwapStatus> {
        let image = image_index as usize;

        let previous_fence = self.images_in_flight[image];
        if previous_fence != vk::Fence::null() {
            unsafe {
                self.device
                    .handle()
                    .wait_for_fences(&[previous_fence], true, u64::MAX)?;
            }
        }

        let frame = &self.frames[self.current_frame];
        self.images_in_flight[image] = frame.in_flight().handle();

        let wait_semaphores = [frame.image_available().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.render_finished().handle()];
        let command_buffers = [command_buffer];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        frame.in_flight().reset()?;
        // SAFETY: the command buffer was ended by the caller and the fence
        // was just reset after being waited on in acquire_next_image.
        unsafe {
            self.device
                .submit_graphics(&[submit_info], frame.in_flight().handle())?;
        }

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain_loader
                .queue_present(self.device.present_queue(), &present_info)
        };

        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
        SwapStatus::from_present(result)
    }

    /// `(color, depth)` attachment formats.
    #[inline]
    pub fn formats(&self) -> (vk::Format, vk::Format) {
        (self.color_format, self.depth_format)
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// # Panics
    ///
    /// Panics if `index` is not a valid image index.
    #[inline]
    pub fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        self.framebuffers[index]
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn extent_aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height as f32
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        let device = self.device.handle();
        unsafe {
            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            if self.render_pass != vk::RenderPass::null() {
                device.destroy_render_pass(self.render_pass, None);
            }
        }
        self.framebuffers.clear();
        self.depth_images.clear();

        unsafe {
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }
        self.image_views.clear();

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}

/// Prefers B8G8R8A8_SRGB with SRGB_NONLINEAR, then B8G8R8A8_UNORM, then
/// whatever comes first.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = preferred {
        debug!("Selected preferred surface format: B8G8R8A8_SRGB with SRGB_NONLINEAR");
        return format;
    }

    let alternative = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_UNORM && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = alternative {
        warn!("Using fallback surface format: B8G8R8A8_UNORM with SRGB_NONLINEAR");
        return format;
    }

    warn!(
        "Using first available surface format: {:?}",
        formats[0].format
    );
    formats[0]
}

/// MAILBOX when preferred and available, FIFO otherwise.
///
/// FIFO is always supported.
fn choose_present_mode(
    present_modes: &[vk::PresentModeKHR],
    prefer_mailbox: bool,
) -> vk::PresentModeKHR {
    if prefer_mailbox && present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        debug!("Selected MAILBOX present mode");
        return vk::PresentModeKHR::MAILBOX;
    }

    debug!("Selected FIFO present mode (vsync)");
    vk::PresentModeKHR::FIFO
}

/// Uses the surface's current extent when defined, otherwise clamps the
/// requested size to the surface limits.
fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum when there is one.
fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}
