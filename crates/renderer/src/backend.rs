//! The device-facing seam of the frame orchestrator.
//!
//! [`Renderer`](crate::Renderer) only drives the frame state machine. Every
//! call that reaches the GPU goes through a [`FrameBackend`], and every call
//! on the swap chain through its [`PresentChain`]. The production
//! implementation lives in [`vulkan`](crate::vulkan); tests substitute a
//! scripted one.

use ash::vk;
use ember_rhi::{RhiResult, SwapStatus};

/// A set of presentable images with per-frame synchronization.
pub trait PresentChain {
    /// Waits for the current frame slot to retire and acquires an image.
    ///
    /// `OutOfDate` is reported as a status, never as an error.
    fn acquire_next_image(&mut self) -> RhiResult<(u32, SwapStatus)>;

    /// Submits `command_buffer` and presents `image_index`, then advances to
    /// the next frame slot.
    fn submit_and_present(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> RhiResult<SwapStatus>;

    fn image_count(&self) -> usize;

    fn render_pass(&self) -> vk::RenderPass;

    fn framebuffer(&self, index: usize) -> vk::Framebuffer;

    fn extent(&self) -> vk::Extent2D;

    /// `(color, depth)` attachment formats.
    fn formats(&self) -> (vk::Format, vk::Format);

    /// True when both attachment formats match `other`, so pipelines built
    /// against one chain's render pass stay valid for the other.
    fn compare_swap_formats(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.formats() == other.formats()
    }

    fn extent_aspect_ratio(&self) -> f32 {
        let extent = self.extent();
        extent.width as f32 / extent.height as f32
    }
}

/// Device operations the frame orchestrator needs.
pub trait FrameBackend {
    type Chain: PresentChain;

    /// Builds a swap chain for `extent`. `previous`, when given, is the chain
    /// being replaced; it stays alive until this call returns.
    fn create_swap_chain(
        &mut self,
        extent: vk::Extent2D,
        previous: Option<&Self::Chain>,
    ) -> RhiResult<Self::Chain>;

    fn allocate_command_buffers(&mut self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>>;

    fn free_command_buffers(&mut self, buffers: &[vk::CommandBuffer]);

    fn begin_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()>;

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()>;

    fn begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    );

    fn end_render_pass(&self, command_buffer: vk::CommandBuffer);

    fn set_viewport(&self, command_buffer: vk::CommandBuffer, viewport: &vk::Viewport);

    fn set_scissor(&self, command_buffer: vk::CommandBuffer, scissor: &vk::Rect2D);

    /// Blocks until the device has finished all submitted work.
    fn wait_idle(&self) -> RhiResult<()>;
}
