//! Ember demo: two vases on a floor lit by six orbiting point lights.
//!
//! Controls: WASD moves, E/Q rises and sinks, arrow keys look around,
//! Escape quits.

use std::f32::consts::TAU;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use tracing::{debug, info};

use ember_core::{EngineConfig, Timer, init_logging};
use ember_platform::{KeyCode, PresentationSurface, Window};
use ember_renderer::{
    FrameInfo, GlobalUbo, MeshRenderSystem, PointLightSystem, RenderSystem, Renderer,
    UniformRing, VulkanBackend,
};
use ember_resources::Model;
use ember_rhi::device::Device;
use ember_rhi::instance::Instance;
use ember_rhi::physical_device::select_physical_device;
use ember_scene::{Camera, GameObjects, KeyboardMovementController, TransformComponent};

const FOV_Y_DEGREES: f32 = 50.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

const LIGHT_COLORS: [Vec3; 6] = [
    Vec3::new(1.0, 0.1, 0.1),
    Vec3::new(0.1, 0.1, 1.0),
    Vec3::new(0.1, 1.0, 0.1),
    Vec3::new(1.0, 1.0, 0.1),
    Vec3::new(0.1, 1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
];

fn main() -> Result<()> {
    init_logging();
    info!("Starting ember v{}", env!("CARGO_PKG_VERSION"));

    run()
}

/// Runs until the window is closed, then drains the GPU.
fn run() -> Result<()> {
    let mut timer = Timer::new();
    let config = EngineConfig::load();
    debug!("Configuration: {:?}", config);

    let mut window = Window::new(
        config.window.width,
        config.window.height,
        &config.window.title,
    )
    .context("Failed to create window")?;

    let instance = Instance::new(config.render.validation, &window.required_extensions()?)
        .context("Failed to create Vulkan instance")?;
    let surface = window
        .create_surface(instance.entry(), instance.handle())
        .context("Failed to create window surface")?;
    let physical_device =
        select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
    let device = Device::new(&instance, &physical_device)?;

    let backend = VulkanBackend::new(device.clone(), surface, config.render.prefer_mailbox)?;
    let mut renderer =
        Renderer::new(backend, &mut window)?.with_clear_color(config.render.clear_color);

    let global_ubos = UniformRing::<GlobalUbo>::new(device.clone())?;
    let mesh_system = MeshRenderSystem::new(
        device.clone(),
        renderer.swap_chain_render_pass(),
        global_ubos.layout(),
        &config.assets,
    )?;
    let point_light_system = PointLightSystem::new(
        device.clone(),
        renderer.swap_chain_render_pass(),
        global_ubos.layout(),
        &config.assets,
    )?;
    let systems: [&dyn RenderSystem; 2] = [&mesh_system, &point_light_system];

    let mut game_objects = load_scene(&device, &config)?;
    info!("Scene ready: {} object(s)", game_objects.len());

    let mut camera = Camera::new();
    let mut viewer = TransformComponent::new().with_translation(Vec3::new(0.0, 0.0, -2.5));
    let controller = KeyboardMovementController::new();

    info!("Startup took {:.2}s", timer.elapsed().as_secs_f32());
    // Startup is not part of the first frame
    timer.reset();

    while !window.should_close() {
        window.poll_events();
        if window.input().is_key_pressed(KeyCode::Escape) {
            window.request_close();
            continue;
        }

        let frame_time = timer.frame_time();
        controller.move_in_plane_xz(window.input(), frame_time, &mut viewer);
        camera.set_view_yxz(viewer.translation, viewer.rotation);
        camera.set_perspective_projection(
            FOV_Y_DEGREES.to_radians(),
            renderer.aspect_ratio(),
            NEAR_PLANE,
            FAR_PLANE,
        );

        let Some(command_buffer) = renderer.begin_frame(&mut window)? else {
            continue;
        };
        let frame_index = renderer.frame_index();

        let mut frame_info = FrameInfo {
            frame_index,
            frame_time,
            command_buffer: renderer.backend().command_buffer(command_buffer),
            camera: &camera,
            global_descriptor_set: global_ubos.descriptor_set(frame_index),
            game_objects: &mut game_objects,
        };

        let mut ubo = GlobalUbo {
            projection: camera.projection(),
            view: camera.view(),
            inverse_view: camera.inverse_view(),
            ..Default::default()
        };
        for system in &systems {
            system.update(&mut frame_info, &mut ubo);
        }
        global_ubos.write(frame_index, &ubo)?;

        renderer.begin_swap_chain_render_pass(command_buffer);
        for system in &systems {
            system.render(&frame_info);
        }
        renderer.end_swap_chain_render_pass(command_buffer);
        renderer.end_frame(&mut window)?;
    }

    info!(
        "Close requested after {:.1}s, waiting for the GPU to finish",
        timer.elapsed().as_secs_f32()
    );
    device.wait_idle()?;
    Ok(())
}

fn load_model(device: &Arc<Device>, config: &EngineConfig, name: &str) -> Result<Arc<Model>> {
    let path = config.assets.model(name);
    let model = Model::from_file(device.clone(), &path)
        .with_context(|| format!("Failed to load model {}", path.display()))?;
    Ok(Arc::new(model))
}

fn load_scene(device: &Arc<Device>, config: &EngineConfig) -> Result<GameObjects> {
    let mut objects = GameObjects::new();

    let flat_vase = objects.create();
    flat_vase.model = Some(load_model(device, config, "flat_vase.obj")?);
    flat_vase.transform = TransformComponent::new()
        .with_translation(Vec3::new(-0.5, 0.5, 0.0))
        .with_scale(Vec3::new(3.0, 1.5, 3.0));

    let smooth_vase = objects.create();
    smooth_vase.model = Some(load_model(device, config, "smooth_vase.obj")?);
    smooth_vase.transform = TransformComponent::new()
        .with_translation(Vec3::new(0.5, 0.5, 0.0))
        .with_scale(Vec3::new(3.0, 1.5, 3.0));

    let floor = objects.create();
    floor.model = Some(load_model(device, config, "quad.obj")?);
    floor.transform = TransformComponent::new()
        .with_translation(Vec3::new(0.0, 0.5, 0.0))
        .with_scale(Vec3::new(3.0, 1.0, 3.0));

    for (i, color) in LIGHT_COLORS.iter().enumerate() {
        let angle = i as f32 * TAU / LIGHT_COLORS.len() as f32;
        let light = objects.make_point_light(0.2, 0.1, *color);
        light.transform.translation = Mat4::from_axis_angle(Vec3::NEG_Y, angle)
            .transform_point3(Vec3::new(-1.0, -1.0, -1.0));
    }

    Ok(objects)
}
