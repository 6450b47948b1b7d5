//! Window management using winit.
//!
//! The window owns its event loop and is pumped explicitly by the frame loop
//! (`poll_events` once per frame, `wait_events` while minimized) instead of
//! handing control to `EventLoop::run_app`. Resize events only record the
//! new extent and raise a flag; the renderer decides when to act on it.

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use ember_core::{Error, Result};

use crate::input::InputState;
use crate::surface::PresentationSurface;

/// How many short pumps to wait for the platform to hand us a window.
const CREATE_ATTEMPTS: u32 = 200;
const CREATE_PUMP_TIMEOUT: Duration = Duration::from_millis(10);

/// RAII wrapper for a Vulkan surface.
///
/// The caller must ensure that the Vulkan instance outlives this surface.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Raw surface handle. Valid only as long as this `Surface` exists.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Loader used to query surface capabilities, formats and present modes.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: The surface was created by ash_window::create_surface from
        // the same instance as the loader, and is destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// Event-handler half of the window: everything winit calls back into.
struct WindowState {
    width: u32,
    height: u32,
    title: String,
    window: Option<Arc<WinitWindow>>,
    resized: bool,
    close_requested: bool,
    input: InputState,
    create_error: Option<String>,
}

impl WindowState {
    fn record_resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.resized = true;
        tracing::debug!("Window resized: {}x{}", width, height);
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(self.width, self.height))
            .with_resizable(true);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let size = window.inner_size();
                self.width = size.width;
                self.height = size.height;
                tracing::info!("Window created: {}x{}", size.width, size.height);
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                self.create_error = Some(e.to_string());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => self.record_resize(size.width, size.height),
            WindowEvent::Focused(false) => self.input.release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.input.on_key_pressed(code),
                        ElementState::Released => self.input.on_key_released(code),
                    }
                }
            }
            _ => {}
        }
    }
}

/// A native window with its own event pump.
pub struct Window {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl Window {
    /// Create the event loop and a window with the given size and title.
    ///
    /// Blocks until the platform has delivered the window.
    pub fn new(width: u32, height: u32, title: &str) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;

        let mut window = Self {
            event_loop,
            state: WindowState {
                width,
                height,
                title: title.to_string(),
                window: None,
                resized: false,
                close_requested: false,
                input: InputState::new(),
                create_error: None,
            },
        };

        for _ in 0..CREATE_ATTEMPTS {
            let status = window.pump(Some(CREATE_PUMP_TIMEOUT));
            if let Some(err) = window.state.create_error.take() {
                return Err(Error::Window(err));
            }
            if window.state.window.is_some() {
                // The initial size is not a resize.
                window.state.resized = false;
                return Ok(window);
            }
            if let PumpStatus::Exit(code) = status {
                return Err(Error::Window(format!(
                    "Event loop exited with code {} before the window was created",
                    code
                )));
            }
        }

        Err(Error::Window("Timed out waiting for window creation".into()))
    }

    fn pump(&mut self, timeout: Option<Duration>) -> PumpStatus {
        let status = self.event_loop.pump_app_events(timeout, &mut self.state);
        if let PumpStatus::Exit(_) = status {
            self.state.close_requested = true;
        }
        status
    }

    /// Process all pending events without blocking.
    pub fn poll_events(&mut self) {
        self.state.input.begin_frame();
        self.pump(Some(Duration::ZERO));
    }

    /// Block until at least one event arrives, then process it.
    pub fn wait_events(&mut self) {
        self.pump(None);
    }

    pub fn width(&self) -> u32 {
        self.state.width
    }

    pub fn height(&self) -> u32 {
        self.state.height
    }

    /// Width over height; 1.0 while minimized.
    pub fn aspect_ratio(&self) -> f32 {
        if self.state.height == 0 {
            return 1.0;
        }
        self.state.width as f32 / self.state.height as f32
    }

    pub fn input(&self) -> &InputState {
        &self.state.input
    }

    /// Ask the window to close at the next `should_close` check.
    pub fn request_close(&mut self) {
        self.state.close_requested = true;
    }

    fn handles(
        &self,
    ) -> Result<(
        raw_window_handle::DisplayHandle<'_>,
        raw_window_handle::WindowHandle<'_>,
    )> {
        let window = self
            .state
            .window
            .as_ref()
            .ok_or_else(|| Error::Window("Window has not been created".into()))?;

        let display_handle = window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        Ok((display_handle, window_handle))
    }

    /// Instance extensions needed to create a surface for this window.
    ///
    /// The returned pointers reference static strings owned by ash-window.
    pub fn required_extensions(&self) -> Result<Vec<*const std::ffi::c_char>> {
        let (display_handle, _) = self.handles()?;
        let extensions = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| Error::Vulkan(format!("Failed to enumerate required extensions: {}", e)))?;

        tracing::debug!(
            "Required Vulkan extensions for surface: {:?}",
            extensions
                .iter()
                // SAFETY: ash_window returns valid, null-terminated static strings.
                .map(|&ext| unsafe { std::ffi::CStr::from_ptr(ext) })
                .collect::<Vec<_>>()
        );

        Ok(extensions.to_vec())
    }

    /// Create a Vulkan surface for this window.
    ///
    /// `instance` must outlive the returned [`Surface`].
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let (display_handle, window_handle) = self.handles()?;

        // SAFETY: entry and instance are valid; the handles come from a live
        // winit window. The surface is destroyed in Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }
}

impl PresentationSurface for Window {
    fn should_close(&self) -> bool {
        self.state.close_requested
    }

    fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.state.width,
            height: self.state.height,
        }
    }

    fn was_resized(&self) -> bool {
        self.state.resized
    }

    fn reset_resized_flag(&mut self) {
        self.state.resized = false;
    }

    fn wait_events(&mut self) {
        Window::wait_events(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(width: u32, height: u32) -> WindowState {
        WindowState {
            width,
            height,
            title: String::new(),
            window: None,
            resized: false,
            close_requested: false,
            input: InputState::new(),
            create_error: None,
        }
    }

    #[test]
    fn test_resize_sets_flag_and_extent() {
        let mut s = state(800, 600);
        s.record_resize(1024, 768);
        assert!(s.resized);
        assert_eq!((s.width, s.height), (1024, 768));
    }

    #[test]
    fn test_same_size_is_not_a_resize() {
        let mut s = state(800, 600);
        s.record_resize(800, 600);
        assert!(!s.resized);
    }

    #[test]
    fn test_minimize_records_zero_extent() {
        let mut s = state(800, 600);
        s.record_resize(0, 0);
        assert!(s.resized);
        assert_eq!((s.width, s.height), (0, 0));
    }
}
