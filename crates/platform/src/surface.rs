//! The presentation-surface contract the renderer polls.

use ash::vk;

/// What the frame orchestrator needs from the thing it presents into.
///
/// Resize notifications arrive asynchronously and are only recorded; the
/// orchestrator reads and clears the flag at frame boundaries.
pub trait PresentationSurface {
    /// The user or platform asked the window to close.
    fn should_close(&self) -> bool;

    /// Current drawable extent. Zero in either dimension while minimized.
    fn extent(&self) -> vk::Extent2D;

    fn was_resized(&self) -> bool;

    fn reset_resized_flag(&mut self);

    /// Block until the windowing system delivers at least one event.
    fn wait_events(&mut self);
}

/// True when a swap chain cannot be created for `extent`.
pub fn is_degenerate(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}
