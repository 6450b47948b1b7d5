//! Orbiting point lights drawn as camera-facing billboards.

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use tracing::info;

use ember_core::config::AssetConfig;
use ember_rhi::RhiResult;
use ember_rhi::device::Device;
use ember_rhi::pipeline::{Pipeline, PipelineConfigInfo, PipelineLayout};
use ember_scene::GameObjects;

use crate::frame_info::FrameInfo;
use crate::systems::RenderSystem;
use crate::ubo::{GlobalUbo, MAX_LIGHTS, PointLight};

const VERTEX_SHADER: &str = "point_light_shader.vert.spv";
const FRAGMENT_SHADER: &str = "point_light_shader.frag.spv";

const PUSH_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

/// Axis the lights orbit around; world up.
pub const ORBIT_AXIS: Vec3 = Vec3::NEG_Y;

/// Vertices of the billboard quad generated in the vertex shader.
const BILLBOARD_VERTEX_COUNT: u32 = 6;

/// Per-light data for the billboard shaders.
///
/// # Memory Layout
///
/// - Offset 0: position (w ignored)
/// - Offset 16: color (w is intensity)
/// - Offset 32: radius
/// - Offset 36: padding (12 bytes)
/// - Total size: 48 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PointLightPushConstants {
    pub position: Vec4,
    pub color: Vec4,
    pub radius: f32,
    pub _padding: [f32; 3],
}

impl PointLightPushConstants {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Rotates every light about [`ORBIT_AXIS`] by `frame_time` radians and
/// copies the lights, in scene order, into `ubo.point_lights`.
///
/// # Panics
///
/// Panics if the scene holds more than [`MAX_LIGHTS`] lights.
pub fn update_point_lights(objects: &mut GameObjects, frame_time: f32, ubo: &mut GlobalUbo) {
    let rotation = Mat4::from_axis_angle(ORBIT_AXIS, frame_time);

    let mut light_index = 0;
    for object in objects.iter_mut() {
        let Some(light) = object.point_light else {
            continue;
        };

        assert!(
            light_index < MAX_LIGHTS,
            "point light count exceeds MAX_LIGHTS"
        );

        object.transform.translation = rotation.transform_point3(object.transform.translation);

        ubo.point_lights[light_index] = PointLight {
            position: object.transform.translation.extend(1.0),
            color: object.color.extend(light.light_intensity),
        };
        light_index += 1;
    }

    ubo.num_lights = light_index as i32;
}

/// Updates the light array and draws one billboard per light.
pub struct PointLightSystem {
    pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
}

impl PointLightSystem {
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        global_set_layout: vk::DescriptorSetLayout,
        assets: &AssetConfig,
    ) -> RhiResult<Self> {
        let push_range = vk::PushConstantRange::default()
            .stage_flags(PUSH_STAGES)
            .offset(0)
            .size(PointLightPushConstants::SIZE as u32);

        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[global_set_layout], &[push_range])?;

        // The quad is generated from gl_VertexIndex
        let config = PipelineConfigInfo {
            pipeline_layout: pipeline_layout.handle(),
            render_pass,
            ..Default::default()
        }
        .without_vertex_input();

        let pipeline = Pipeline::new(
            device,
            &assets.shader(VERTEX_SHADER),
            &assets.shader(FRAGMENT_SHADER),
            &config,
        )?;

        info!("Point light system ready");

        Ok(Self {
            pipeline,
            pipeline_layout,
        })
    }
}

impl RenderSystem for PointLightSystem {
    fn update(&self, frame_info: &mut FrameInfo<'_>, ubo: &mut GlobalUbo) {
        update_point_lights(frame_info.game_objects, frame_info.frame_time, ubo);
    }

    fn render(&self, frame_info: &FrameInfo<'_>) {
        let cmd = &frame_info.command_buffer;
        let layout = self.pipeline_layout.handle();

        self.pipeline.bind(cmd);
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            layout,
            0,
            &[frame_info.global_descriptor_set],
        );

        for object in frame_info.game_objects.iter() {
            let Some(light) = object.point_light else {
                continue;
            };

            let push = PointLightPushConstants {
                position: object.transform.translation.extend(1.0),
                color: object.color.extend(light.light_intensity),
                radius: object.light_radius(),
                _padding: [0.0; 3],
            };
            cmd.push_constants(layout, PUSH_STAGES, 0, &push);
            cmd.draw(BILLBOARD_VERTEX_COUNT, 1, 0, 0);
        }
    }
}
