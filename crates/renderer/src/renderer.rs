//! Frame orchestration and swap chain recreation.
//!
//! [`Renderer`] walks one frame at a time through
//! `Idle -> Recording -> InRenderPass -> Recording -> Idle`:
//!
//! ```text
//! begin_frame()                  acquire, begin the slot's command buffer
//!   begin_swap_chain_render_pass()   clear, full viewport and scissor
//!     ... render systems record draws ...
//!   end_swap_chain_render_pass()
//! end_frame()                    end, submit, present, advance the slot
//! ```
//!
//! A stale swap chain (out of date, suboptimal, or a resized surface) is
//! rebuilt at a frame boundary and the current frame is skipped. That is
//! the only recovered condition; every other failure is returned.
//!
//! # Example
//!
//! ```no_run
//! use ember_platform::Window;
//! use ember_renderer::{Renderer, VulkanBackend};
//!
//! # fn example(backend: VulkanBackend, window: &mut Window) -> Result<(), ember_renderer::RendererError> {
//! let mut renderer = Renderer::new(backend, window)?;
//!
//! if let Some(command_buffer) = renderer.begin_frame(window)? {
//!     renderer.begin_swap_chain_render_pass(command_buffer);
//!     // record draws
//!     renderer.end_swap_chain_render_pass(command_buffer);
//!     renderer.end_frame(window)?;
//! }
//! # Ok(())
//! # }
//! ```

use ash::vk;
use tracing::{debug, info, warn};

use ember_platform::{PresentationSurface, is_degenerate};
use ember_rhi::command::{full_scissor, full_viewport};
use ember_rhi::{MAX_FRAMES_IN_FLIGHT, RhiError, SwapStatus};

use crate::backend::{FrameBackend, PresentChain};
use crate::error::{RendererError, RendererResult};

/// Near-black default clear color.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.01, 0.01, 0.01, 1.0];

/// Drives frames through a swap chain and recreates it when it goes stale.
///
/// # Resource Destruction Order
///
/// The swap chain is declared before the backend so it is destroyed before
/// the surface the backend owns.
pub struct Renderer<B: FrameBackend> {
    swap_chain: B::Chain,
    backend: B,
    command_buffers: Vec<vk::CommandBuffer>,
    current_image_index: u32,
    current_frame_index: usize,
    is_frame_started: bool,
    clear_color: [f32; 4],
}

impl<B: FrameBackend> Renderer<B> {
    /// Creates the first swap chain for `surface` and one command buffer per
    /// frame in flight.
    ///
    /// Blocks while the surface has no drawable area.
    ///
    /// # Errors
    ///
    /// [`RendererError::SurfaceClosed`] if the surface is closed while
    /// waiting for a drawable extent, or any swap chain or command buffer
    /// creation failure.
    pub fn new(mut backend: B, surface: &mut impl PresentationSurface) -> RendererResult<Self> {
        let extent = wait_for_drawable_extent(surface).ok_or(RendererError::SurfaceClosed)?;
        let swap_chain = backend.create_swap_chain(extent, None)?;
        let command_buffers = backend.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;

        info!(
            "Renderer ready: {}x{}, {} swap chain image(s), {} frame(s) in flight",
            swap_chain.extent().width,
            swap_chain.extent().height,
            swap_chain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            swap_chain,
            backend,
            command_buffers,
            current_image_index: 0,
            current_frame_index: 0,
            is_frame_started: false,
            clear_color: DEFAULT_CLEAR_COLOR,
        })
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    /// Acquires the next image and begins recording this slot's command
    /// buffer.
    ///
    /// Returns `None` when the swap chain was out of date. It has been
    /// rebuilt and the caller should skip rendering this iteration; the frame
    /// index does not advance.
    ///
    /// # Panics
    ///
    /// Panics if a frame is already in progress.
    pub fn begin_frame(
        &mut self,
        surface: &mut impl PresentationSurface,
    ) -> RendererResult<Option<vk::CommandBuffer>> {
        assert!(
            !self.is_frame_started,
            "cannot begin a frame while one is already in progress"
        );

        let (image_index, status) = self
            .swap_chain
            .acquire_next_image()
            .map_err(RendererError::Acquire)?;

        if status == SwapStatus::OutOfDate {
            debug!("Swap chain out of date at acquire");
            self.recreate_swap_chain(surface)?;
            return Ok(None);
        }

        self.current_image_index = image_index;
        self.is_frame_started = true;

        let command_buffer = self.current_command_buffer();
        self.backend.begin_command_buffer(command_buffer)?;
        Ok(Some(command_buffer))
    }

    /// Ends recording, submits and presents, then advances the frame index.
    ///
    /// The swap chain is rebuilt when presentation reports it out of date or
    /// suboptimal, or when the surface was resized since the last check.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in progress.
    pub fn end_frame(&mut self, surface: &mut impl PresentationSurface) -> RendererResult<()> {
        assert!(
            self.is_frame_started,
            "cannot end a frame that was never begun"
        );

        let command_buffer = self.current_command_buffer();
        self.backend.end_command_buffer(command_buffer)?;

        let status = self
            .swap_chain
            .submit_and_present(command_buffer, self.current_image_index)
            .map_err(RendererError::Present)?;
        self.is_frame_started = false;

        if status != SwapStatus::Optimal || surface.was_resized() {
            debug!(
                "Swap chain stale at present: status={:?}, resized={}",
                status,
                surface.was_resized()
            );
            surface.reset_resized_flag();
            self.recreate_swap_chain(surface)?;
        }

        self.current_frame_index = (self.current_frame_index + 1) % MAX_FRAMES_IN_FLIGHT;
        Ok(())
    }

    /// Begins the swap chain render pass on the current image, clearing
    /// color and depth, and sets a viewport and scissor covering the extent.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in progress or `command_buffer` is not the
    /// current frame's buffer.
    pub fn begin_swap_chain_render_pass(&self, command_buffer: vk::CommandBuffer) {
        self.check_render_pass_buffer(command_buffer);

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let extent = self.swap_chain.extent();
        self.backend.begin_render_pass(
            command_buffer,
            self.swap_chain.render_pass(),
            self.swap_chain
                .framebuffer(self.current_image_index as usize),
            extent,
            &clear_values,
        );
        self.backend
            .set_viewport(command_buffer, &full_viewport(extent));
        self.backend
            .set_scissor(command_buffer, &full_scissor(extent));
    }

    /// # Panics
    ///
    /// Same conditions as [`begin_swap_chain_render_pass`](Self::begin_swap_chain_render_pass).
    pub fn end_swap_chain_render_pass(&self, command_buffer: vk::CommandBuffer) {
        self.check_render_pass_buffer(command_buffer);
        self.backend.end_render_pass(command_buffer);
    }

    fn check_render_pass_buffer(&self, command_buffer: vk::CommandBuffer) {
        assert!(
            self.is_frame_started,
            "cannot record a render pass without a frame in progress"
        );
        assert!(
            command_buffer == self.current_command_buffer(),
            "render pass begun on a command buffer from a different frame"
        );
    }

    /// Rebuilds the swap chain for the surface's current extent.
    ///
    /// Waits on surface events while the extent is degenerate, then idles
    /// the device before replacing the chain. If the surface is closed while
    /// waiting, the old chain is kept and nothing is rebuilt.
    fn recreate_swap_chain(&mut self, surface: &mut impl PresentationSurface) -> RendererResult<()> {
        let Some(extent) = wait_for_drawable_extent(surface) else {
            warn!("Surface closed while minimized; skipping swap chain recreation");
            return Ok(());
        };

        self.backend.wait_idle()?;

        let swap_chain = self
            .backend
            .create_swap_chain(extent, Some(&self.swap_chain))?;

        if !self.swap_chain.compare_swap_formats(&swap_chain) {
            return Err(RhiError::SwapchainFormatMismatch {
                old: self.swap_chain.formats(),
                new: swap_chain.formats(),
            }
            .into());
        }

        let old_image_count = self.swap_chain.image_count();
        self.swap_chain = swap_chain;

        if self.swap_chain.image_count() != old_image_count {
            debug!(
                "Swap chain image count changed {} -> {}, reallocating command buffers",
                old_image_count,
                self.swap_chain.image_count()
            );
            self.backend.free_command_buffers(&self.command_buffers);
            self.command_buffers = self
                .backend
                .allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;
        }

        info!(
            "Swap chain recreated: {}x{}",
            extent.width, extent.height
        );
        Ok(())
    }

    /// Width over height of the current swap chain.
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.swap_chain.extent_aspect_ratio()
    }

    /// Render pass every swap chain framebuffer is compatible with.
    #[inline]
    pub fn swap_chain_render_pass(&self) -> vk::RenderPass {
        self.swap_chain.render_pass()
    }

    #[inline]
    pub fn swap_chain(&self) -> &B::Chain {
        &self.swap_chain
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn is_frame_in_progress(&self) -> bool {
        self.is_frame_started
    }

    /// Frame-in-flight slot, in `0..MAX_FRAMES_IN_FLIGHT`.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in progress.
    #[inline]
    pub fn frame_index(&self) -> usize {
        assert!(
            self.is_frame_started,
            "cannot get frame index when frame not in progress"
        );
        self.current_frame_index
    }

    /// Frame-in-flight slot the next `begin_frame` records into.
    #[inline]
    pub fn next_frame_index(&self) -> usize {
        self.current_frame_index
    }

    /// # Panics
    ///
    /// Panics if no frame is in progress.
    #[inline]
    pub fn current_command_buffer(&self) -> vk::CommandBuffer {
        assert!(
            self.is_frame_started,
            "cannot get command buffer when frame not in progress"
        );
        self.command_buffers[self.current_frame_index]
    }
}

impl<B: FrameBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            warn!("Device wait idle failed during renderer teardown: {}", e);
        }
        self.backend.free_command_buffers(&self.command_buffers);
        debug!("Renderer destroyed");
    }
}

/// Current extent of `surface`, blocking on its events while either
/// dimension is zero. `None` if the surface is closed in the meantime.
fn wait_for_drawable_extent(surface: &mut impl PresentationSurface) -> Option<vk::Extent2D> {
    let mut extent = surface.extent();
    while is_degenerate(extent) {
        if surface.should_close() {
            return None;
        }
        surface.wait_events();
        extent = surface.extent();
    }
    Some(extent)
}
