//! Frame orchestration against a scripted backend and surface.
//!
//! Nothing here touches a GPU: the backend records every call it receives
//! and replays queued acquire and present results.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ember_platform::PresentationSurface;
use ember_renderer::{
    DEFAULT_CLEAR_COLOR, FrameBackend, MAX_FRAMES_IN_FLIGHT, PresentChain, Renderer,
    RendererError, SwapStatus,
};
use ember_rhi::vk::{self, Handle};
use ember_rhi::{RhiError, RhiResult};

const EXTENT: vk::Extent2D = vk::Extent2D {
    width: 800,
    height: 600,
};
const FORMATS: (vk::Format, vk::Format) = (vk::Format::B8G8R8A8_SRGB, vk::Format::D32_SFLOAT);

#[derive(Clone, Debug, PartialEq)]
enum Event {
    CreateSwapChain {
        extent: vk::Extent2D,
        had_previous: bool,
    },
    Allocate(u32),
    Free(usize),
    Begin(vk::CommandBuffer),
    End(vk::CommandBuffer),
    BeginRenderPass {
        framebuffer: vk::Framebuffer,
        clear_color: [f32; 4],
        clear_depth: f32,
    },
    EndRenderPass,
    Viewport(vk::Extent2D),
    Scissor(vk::Extent2D),
    Present {
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    },
    WaitIdle,
}

struct Script {
    acquire: VecDeque<RhiResult<(u32, SwapStatus)>>,
    present: VecDeque<RhiResult<SwapStatus>>,
    next_formats: (vk::Format, vk::Format),
    next_image_count: usize,
    next_command_buffer: u64,
    events: Vec<Event>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            acquire: VecDeque::new(),
            present: VecDeque::new(),
            next_formats: FORMATS,
            next_image_count: 3,
            next_command_buffer: 1,
            events: Vec::new(),
        }
    }
}

type Shared = Rc<RefCell<Script>>;

struct MockChain {
    script: Shared,
    extent: vk::Extent2D,
    formats: (vk::Format, vk::Format),
    image_count: usize,
}

impl PresentChain for MockChain {
    fn acquire_next_image(&mut self) -> RhiResult<(u32, SwapStatus)> {
        self.script
            .borrow_mut()
            .acquire
            .pop_front()
            .unwrap_or(Ok((0, SwapStatus::Optimal)))
    }

    fn submit_and_present(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> RhiResult<SwapStatus> {
        let mut script = self.script.borrow_mut();
        script.events.push(Event::Present {
            command_buffer,
            image_index,
        });
        script.present.pop_front().unwrap_or(Ok(SwapStatus::Optimal))
    }

    fn image_count(&self) -> usize {
        self.image_count
    }

    fn render_pass(&self) -> vk::RenderPass {
        vk::RenderPass::from_raw(7)
    }

    fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        vk::Framebuffer::from_raw(100 + index as u64)
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn formats(&self) -> (vk::Format, vk::Format) {
        self.formats
    }
}

struct MockBackend {
    script: Shared,
}

impl MockBackend {
    fn push(&self, event: Event) {
        self.script.borrow_mut().events.push(event);
    }
}

impl FrameBackend for MockBackend {
    type Chain = MockChain;

    fn create_swap_chain(
        &mut self,
        extent: vk::Extent2D,
        previous: Option<&MockChain>,
    ) -> RhiResult<MockChain> {
        self.push(Event::CreateSwapChain {
            extent,
            had_previous: previous.is_some(),
        });
        let script = self.script.borrow();
        Ok(MockChain {
            script: self.script.clone(),
            extent,
            formats: script.next_formats,
            image_count: script.next_image_count,
        })
    }

    fn allocate_command_buffers(&mut self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>> {
        self.push(Event::Allocate(count));
        let mut script = self.script.borrow_mut();
        let first = script.next_command_buffer;
        script.next_command_buffer += u64::from(count);
        Ok((first..first + u64::from(count))
            .map(vk::CommandBuffer::from_raw)
            .collect())
    }

    fn free_command_buffers(&mut self, buffers: &[vk::CommandBuffer]) {
        self.push(Event::Free(buffers.len()));
    }

    fn begin_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        self.push(Event::Begin(command_buffer));
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        self.push(Event::End(command_buffer));
        Ok(())
    }

    fn begin_render_pass(
        &self,
        _command_buffer: vk::CommandBuffer,
        _render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        _extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) {
        // SAFETY: the renderer writes color then depth_stencil
        let (clear_color, clear_depth) = unsafe {
            (
                clear_values[0].color.float32,
                clear_values[1].depth_stencil.depth,
            )
        };
        self.push(Event::BeginRenderPass {
            framebuffer,
            clear_color,
            clear_depth,
        });
    }

    fn end_render_pass(&self, _command_buffer: vk::CommandBuffer) {
        self.push(Event::EndRenderPass);
    }

    fn set_viewport(&self, _command_buffer: vk::CommandBuffer, viewport: &vk::Viewport) {
        self.push(Event::Viewport(vk::Extent2D {
            width: viewport.width as u32,
            height: viewport.height as u32,
        }));
    }

    fn set_scissor(&self, _command_buffer: vk::CommandBuffer, scissor: &vk::Rect2D) {
        self.push(Event::Scissor(scissor.extent));
    }

    fn wait_idle(&self) -> RhiResult<()> {
        self.push(Event::WaitIdle);
        Ok(())
    }
}

struct MockSurface {
    extent: vk::Extent2D,
    resized: bool,
    close_requested: bool,
    /// Extent reported after each successive `wait_events`.
    extents_after_wait: VecDeque<vk::Extent2D>,
    wait_calls: usize,
}

impl MockSurface {
    fn new() -> Self {
        Self {
            extent: EXTENT,
            resized: false,
            close_requested: false,
            extents_after_wait: VecDeque::new(),
            wait_calls: 0,
        }
    }
}

impl PresentationSurface for MockSurface {
    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn was_resized(&self) -> bool {
        self.resized
    }

    fn reset_resized_flag(&mut self) {
        self.resized = false;
    }

    fn wait_events(&mut self) {
        self.wait_calls += 1;
        match self.extents_after_wait.pop_front() {
            Some(extent) => self.extent = extent,
            None => self.close_requested = true,
        }
    }
}

fn setup() -> (Renderer<MockBackend>, MockSurface, Shared) {
    let script: Shared = Rc::new(RefCell::new(Script::default()));
    let mut surface = MockSurface::new();
    let backend = MockBackend {
        script: script.clone(),
    };
    let renderer = Renderer::new(backend, &mut surface).expect("Failed to create renderer");
    script.borrow_mut().events.clear();
    (renderer, surface, script)
}

fn run_frame(renderer: &mut Renderer<MockBackend>, surface: &mut MockSurface) -> bool {
    match renderer.begin_frame(surface).expect("begin_frame failed") {
        Some(command_buffer) => {
            renderer.begin_swap_chain_render_pass(command_buffer);
            renderer.end_swap_chain_render_pass(command_buffer);
            renderer.end_frame(surface).expect("end_frame failed");
            true
        }
        None => false,
    }
}

fn recreations(script: &Shared) -> usize {
    script
        .borrow()
        .events
        .iter()
        .filter(|e| matches!(e, Event::CreateSwapChain { .. }))
        .count()
}

#[test]
fn test_new_creates_chain_and_command_buffers() {
    let script: Shared = Rc::new(RefCell::new(Script::default()));
    let mut surface = MockSurface::new();
    let renderer = Renderer::new(
        MockBackend {
            script: script.clone(),
        },
        &mut surface,
    )
    .unwrap();

    assert_eq!(
        script.borrow().events,
        vec![
            Event::CreateSwapChain {
                extent: EXTENT,
                had_previous: false
            },
            Event::Allocate(MAX_FRAMES_IN_FLIGHT as u32),
        ]
    );
    assert!(!renderer.is_frame_in_progress());
    assert!((renderer.aspect_ratio() - 800.0 / 600.0).abs() < 1e-6);
    assert_eq!(renderer.swap_chain_render_pass(), vk::RenderPass::from_raw(7));
}

#[test]
#[should_panic(expected = "cannot begin a frame while one is already in progress")]
fn test_begin_frame_twice_panics() {
    let (mut renderer, mut surface, _script) = setup();
    renderer.begin_frame(&mut surface).unwrap();
    let _ = renderer.begin_frame(&mut surface);
}

#[test]
#[should_panic(expected = "cannot end a frame that was never begun")]
fn test_end_frame_without_begin_panics() {
    let (mut renderer, mut surface, _script) = setup();
    let _ = renderer.end_frame(&mut surface);
}

#[test]
fn test_out_of_date_acquire_skips_frame() {
    let (mut renderer, mut surface, script) = setup();
    script
        .borrow_mut()
        .acquire
        .push_back(Ok((0, SwapStatus::OutOfDate)));

    let frame = renderer.begin_frame(&mut surface).unwrap();

    assert!(frame.is_none());
    assert!(!renderer.is_frame_in_progress());
    assert_eq!(renderer.next_frame_index(), 0);
    assert_eq!(
        script.borrow().events,
        vec![
            Event::WaitIdle,
            Event::CreateSwapChain {
                extent: EXTENT,
                had_previous: true
            },
        ]
    );

    // The next iteration renders normally
    assert!(run_frame(&mut renderer, &mut surface));
    assert_eq!(renderer.next_frame_index(), 1);
}

#[test]
fn test_frame_index_cycles() {
    let (mut renderer, mut surface, script) = setup();

    for n in 1..=7 {
        assert!(run_frame(&mut renderer, &mut surface));
        assert_eq!(renderer.next_frame_index(), n % MAX_FRAMES_IN_FLIGHT);
    }
    assert_eq!(recreations(&script), 0);

    // Slots alternate between the two command buffers
    let presented: Vec<vk::CommandBuffer> = script
        .borrow()
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Present { command_buffer, .. } => Some(*command_buffer),
            _ => None,
        })
        .collect();
    assert_eq!(presented.len(), 7);
    assert_ne!(presented[0], presented[1]);
    assert_eq!(presented[0], presented[2]);
}

#[test]
fn test_frame_index_only_valid_during_frame() {
    let (mut renderer, mut surface, _script) = setup();
    let command_buffer = renderer.begin_frame(&mut surface).unwrap().unwrap();
    assert_eq!(renderer.frame_index(), 0);
    assert_eq!(renderer.current_command_buffer(), command_buffer);
    renderer.end_frame(&mut surface).unwrap();
}

#[test]
fn test_acquired_image_selects_framebuffer_and_present_target() {
    let (mut renderer, mut surface, script) = setup();
    script
        .borrow_mut()
        .acquire
        .push_back(Ok((2, SwapStatus::Optimal)));

    assert!(run_frame(&mut renderer, &mut surface));

    let events = script.borrow().events.clone();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::BeginRenderPass { framebuffer, .. } if *framebuffer == vk::Framebuffer::from_raw(102)
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Present { image_index: 2, .. })));
}

#[test]
fn test_render_pass_clears_and_sets_dynamic_state() {
    let (mut renderer, mut surface, script) = setup();
    let command_buffer = renderer.begin_frame(&mut surface).unwrap().unwrap();
    renderer.begin_swap_chain_render_pass(command_buffer);
    renderer.end_swap_chain_render_pass(command_buffer);
    renderer.end_frame(&mut surface).unwrap();

    let events = script.borrow().events.clone();
    assert_eq!(
        &events[..6],
        &[
            Event::Begin(command_buffer),
            Event::BeginRenderPass {
                framebuffer: vk::Framebuffer::from_raw(100),
                clear_color: DEFAULT_CLEAR_COLOR,
                clear_depth: 1.0,
            },
            Event::Viewport(EXTENT),
            Event::Scissor(EXTENT),
            Event::EndRenderPass,
            Event::End(command_buffer),
        ]
    );
}

#[test]
fn test_custom_clear_color() {
    let (renderer, mut surface, script) = setup();
    let mut renderer = renderer.with_clear_color([0.2, 0.3, 0.4, 1.0]);
    assert!(run_frame(&mut renderer, &mut surface));

    assert!(script.borrow().events.iter().any(|e| matches!(
        e,
        Event::BeginRenderPass { clear_color, .. } if *clear_color == [0.2, 0.3, 0.4, 1.0]
    )));
}

#[test]
#[should_panic(expected = "render pass begun on a command buffer from a different frame")]
fn test_render_pass_with_foreign_command_buffer_panics() {
    let (mut renderer, mut surface, _script) = setup();
    renderer.begin_frame(&mut surface).unwrap();
    renderer.begin_swap_chain_render_pass(vk::CommandBuffer::from_raw(999));
}

#[test]
#[should_panic(expected = "cannot record a render pass without a frame in progress")]
fn test_render_pass_outside_frame_panics() {
    let (renderer, _surface, _script) = setup();
    renderer.end_swap_chain_render_pass(vk::CommandBuffer::from_raw(1));
}

#[test]
fn test_suboptimal_present_recreates() {
    let (mut renderer, mut surface, script) = setup();
    script
        .borrow_mut()
        .present
        .push_back(Ok(SwapStatus::Suboptimal));

    assert!(run_frame(&mut renderer, &mut surface));
    assert_eq!(recreations(&script), 1);
    assert_eq!(renderer.next_frame_index(), 1);
}

#[test]
fn test_out_of_date_present_recreates() {
    let (mut renderer, mut surface, script) = setup();
    script
        .borrow_mut()
        .present
        .push_back(Ok(SwapStatus::OutOfDate));

    assert!(run_frame(&mut renderer, &mut surface));
    assert_eq!(recreations(&script), 1);
}

#[test]
fn test_resize_flag_recreates_and_clears() {
    let (mut renderer, mut surface, script) = setup();
    surface.resized = true;
    surface.extent = vk::Extent2D {
        width: 1024,
        height: 768,
    };

    assert!(run_frame(&mut renderer, &mut surface));

    assert!(!surface.resized);
    assert!(script.borrow().events.contains(&Event::CreateSwapChain {
        extent: surface.extent,
        had_previous: true
    }));
    assert!((renderer.aspect_ratio() - 1024.0 / 768.0).abs() < 1e-6);

    // Device drained before the new chain is built
    let events = script.borrow().events.clone();
    let idle = events.iter().position(|e| *e == Event::WaitIdle).unwrap();
    let create = events
        .iter()
        .position(|e| matches!(e, Event::CreateSwapChain { .. }))
        .unwrap();
    assert!(idle < create);

    // Flag cleared, so the next frame does not rebuild again
    assert!(run_frame(&mut renderer, &mut surface));
    assert_eq!(recreations(&script), 1);
}

#[test]
fn test_compare_swap_formats_checks_color_and_depth() {
    let chain = |formats| MockChain {
        script: Shared::default(),
        extent: EXTENT,
        formats,
        image_count: 3,
    };
    let base = chain(FORMATS);

    assert!(base.compare_swap_formats(&chain(FORMATS)));
    assert!(!base.compare_swap_formats(&chain((vk::Format::R8G8B8A8_UNORM, FORMATS.1))));
    assert!(!base.compare_swap_formats(&chain((FORMATS.0, vk::Format::D24_UNORM_S8_UINT))));
}

#[test]
fn test_format_mismatch_is_error() {
    let (mut renderer, mut surface, script) = setup();
    script.borrow_mut().next_formats = (vk::Format::R8G8B8A8_UNORM, vk::Format::D32_SFLOAT);
    surface.resized = true;

    renderer.begin_frame(&mut surface).unwrap().unwrap();
    let err = renderer.end_frame(&mut surface).unwrap_err();

    match err {
        RendererError::Rhi(RhiError::SwapchainFormatMismatch { old, new }) => {
            assert_eq!(old, FORMATS);
            assert_eq!(new.0, vk::Format::R8G8B8A8_UNORM);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_image_count_change_reallocates_command_buffers() {
    let (mut renderer, mut surface, script) = setup();
    script.borrow_mut().next_image_count = 2;
    surface.resized = true;

    assert!(run_frame(&mut renderer, &mut surface));

    let events = script.borrow().events.clone();
    assert!(events.contains(&Event::Free(MAX_FRAMES_IN_FLIGHT)));
    assert!(events.contains(&Event::Allocate(MAX_FRAMES_IN_FLIGHT as u32)));

    // Fresh handles are used from here on
    let command_buffer = renderer.begin_frame(&mut surface).unwrap().unwrap();
    assert!(command_buffer.as_raw() > MAX_FRAMES_IN_FLIGHT as u64);
    renderer.end_frame(&mut surface).unwrap();
}

#[test]
fn test_same_image_count_keeps_command_buffers() {
    let (mut renderer, mut surface, script) = setup();
    surface.resized = true;

    assert!(run_frame(&mut renderer, &mut surface));
    assert!(!script
        .borrow()
        .events
        .iter()
        .any(|e| matches!(e, Event::Free(_) | Event::Allocate(_))));
}

#[test]
fn test_degenerate_extent_waits_for_events() {
    let (mut renderer, mut surface, script) = setup();
    surface.extent = vk::Extent2D {
        width: 0,
        height: 0,
    };
    surface.resized = true;
    surface.extents_after_wait = VecDeque::from([
        vk::Extent2D {
            width: 640,
            height: 0,
        },
        vk::Extent2D {
            width: 640,
            height: 480,
        },
    ]);

    assert!(run_frame(&mut renderer, &mut surface));

    assert_eq!(surface.wait_calls, 2);
    assert!(script.borrow().events.contains(&Event::CreateSwapChain {
        extent: vk::Extent2D {
            width: 640,
            height: 480
        },
        had_previous: true
    }));
}

#[test]
fn test_close_while_minimized_skips_recreation() {
    let (mut renderer, mut surface, script) = setup();
    surface.extent = vk::Extent2D {
        width: 0,
        height: 0,
    };
    surface.resized = true;

    assert!(run_frame(&mut renderer, &mut surface));

    assert!(surface.should_close());
    assert_eq!(recreations(&script), 0);
    assert!(!renderer.is_frame_in_progress());
}

#[test]
fn test_acquire_failure_is_fatal() {
    let (mut renderer, mut surface, script) = setup();
    script
        .borrow_mut()
        .acquire
        .push_back(Err(RhiError::SwapchainError(
            "failed to acquire swap chain image: ERROR_DEVICE_LOST".to_string(),
        )));

    let err = renderer.begin_frame(&mut surface).unwrap_err();
    assert!(matches!(err, RendererError::Acquire(_)));
    assert!(err.to_string().contains("failed to acquire swap chain image"));
    assert!(!renderer.is_frame_in_progress());
}

#[test]
fn test_present_failure_is_fatal() {
    let (mut renderer, mut surface, script) = setup();
    script
        .borrow_mut()
        .present
        .push_back(Err(RhiError::SwapchainError(
            "failed to present swap chain image: ERROR_SURFACE_LOST_KHR".to_string(),
        )));

    renderer.begin_frame(&mut surface).unwrap().unwrap();
    let err = renderer.end_frame(&mut surface).unwrap_err();
    assert!(matches!(err, RendererError::Present(_)));
    assert_eq!(recreations(&script), 0);
}

#[test]
fn test_drop_waits_idle_then_frees_command_buffers() {
    let (renderer, _surface, script) = setup();
    drop(renderer);

    assert_eq!(
        script.borrow().events,
        vec![Event::WaitIdle, Event::Free(MAX_FRAMES_IN_FLIGHT)]
    );
}

#[test]
fn test_new_waits_for_drawable_extent() {
    let script: Shared = Rc::new(RefCell::new(Script::default()));
    let mut surface = MockSurface::new();
    surface.extent = vk::Extent2D {
        width: 0,
        height: 0,
    };
    surface.extents_after_wait = VecDeque::from([EXTENT]);

    let renderer = Renderer::new(
        MockBackend {
            script: script.clone(),
        },
        &mut surface,
    )
    .unwrap();
    assert_eq!(surface.wait_calls, 1);
    assert_eq!(renderer.swap_chain().extent(), EXTENT);
}

#[test]
fn test_new_fails_if_closed_before_drawable() {
    let script: Shared = Rc::new(RefCell::new(Script::default()));
    let mut surface = MockSurface::new();
    surface.extent = vk::Extent2D {
        width: 0,
        height: 0,
    };
    surface.close_requested = true;

    let result = Renderer::new(MockBackend { script }, &mut surface);
    assert!(matches!(result, Err(RendererError::SurfaceClosed)));
}
