//! Vulkan implementation of [`FrameBackend`].

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use ember_platform::Surface;
use ember_rhi::command::{CommandBuffer, CommandPool};
use ember_rhi::device::Device;
use ember_rhi::swapchain::Swapchain;
use ember_rhi::{RhiError, RhiResult, SwapStatus};

use crate::backend::{FrameBackend, PresentChain};

impl PresentChain for Swapchain {
    fn acquire_next_image(&mut self) -> RhiResult<(u32, SwapStatus)> {
        Swapchain::acquire_next_image(self)
    }

    fn submit_and_present(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> RhiResult<SwapStatus> {
        Swapchain::submit_and_present(self, command_buffer, image_index)
    }

    fn image_count(&self) -> usize {
        Swapchain::image_count(self)
    }

    fn render_pass(&self) -> vk::RenderPass {
        Swapchain::render_pass(self)
    }

    fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        Swapchain::framebuffer(self, index)
    }

    fn extent(&self) -> vk::Extent2D {
        Swapchain::extent(self)
    }

    fn formats(&self) -> (vk::Format, vk::Format) {
        Swapchain::formats(self)
    }

    fn extent_aspect_ratio(&self) -> f32 {
        Swapchain::extent_aspect_ratio(self)
    }
}

/// Records into command buffers from one pool and presents to one surface.
pub struct VulkanBackend {
    command_pool: CommandPool,
    surface: Surface,
    device: Arc<Device>,
    prefer_mailbox: bool,
}

impl VulkanBackend {
    /// Takes ownership of `surface`; command buffers come from a new pool on
    /// the graphics queue family.
    pub fn new(device: Arc<Device>, surface: Surface, prefer_mailbox: bool) -> RhiResult<Self> {
        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;

        debug!(
            "Vulkan frame backend ready (prefer_mailbox={})",
            prefer_mailbox
        );

        Ok(Self {
            command_pool,
            surface,
            device,
            prefer_mailbox,
        })
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Wraps a raw handle for recording draw commands.
    pub fn command_buffer(&self, handle: vk::CommandBuffer) -> CommandBuffer {
        CommandBuffer::from_handle(self.device.clone(), handle)
    }
}

impl FrameBackend for VulkanBackend {
    type Chain = Swapchain;

    fn create_swap_chain(
        &mut self,
        extent: vk::Extent2D,
        previous: Option<&Swapchain>,
    ) -> RhiResult<Swapchain> {
        Swapchain::new(
            self.device.clone(),
            &self.surface,
            extent,
            previous,
            self.prefer_mailbox,
        )
    }

    fn allocate_command_buffers(&mut self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>> {
        self.command_pool.allocate_command_buffers(count)
    }

    fn free_command_buffers(&mut self, buffers: &[vk::CommandBuffer]) {
        self.command_pool.free_command_buffers(buffers);
    }

    fn begin_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        self.command_buffer(command_buffer).begin()
    }

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        self.command_buffer(command_buffer).end()
    }

    fn begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) {
        self.command_buffer(command_buffer)
            .begin_render_pass(render_pass, framebuffer, extent, clear_values);
    }

    fn end_render_pass(&self, command_buffer: vk::CommandBuffer) {
        self.command_buffer(command_buffer).end_render_pass();
    }

    fn set_viewport(&self, command_buffer: vk::CommandBuffer, viewport: &vk::Viewport) {
        self.command_buffer(command_buffer).set_viewport(viewport);
    }

    fn set_scissor(&self, command_buffer: vk::CommandBuffer, scissor: &vk::Rect2D) {
        self.command_buffer(command_buffer).set_scissor(scissor);
    }

    fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}
