//! Lit mesh rendering.

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tracing::info;

use ember_core::config::AssetConfig;
use ember_rhi::RhiResult;
use ember_rhi::device::Device;
use ember_rhi::pipeline::{Pipeline, PipelineConfigInfo, PipelineLayout};

use crate::frame_info::FrameInfo;
use crate::systems::RenderSystem;

const VERTEX_SHADER: &str = "vert.spv";
const FRAGMENT_SHADER: &str = "frag.spv";

const PUSH_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

/// Per-draw data for the mesh shaders.
///
/// The normal matrix only needs 3x3 but is sent as a full `Mat4` so the
/// host layout matches the shader's column alignment.
///
/// # Memory Layout
///
/// - Offset 0: model matrix (64 bytes)
/// - Offset 64: normal matrix (64 bytes)
/// - Total size: 128 bytes, the guaranteed minimum push constant size
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshPushConstants {
    pub model_matrix: Mat4,
    pub normal_matrix: Mat4,
}

impl MeshPushConstants {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Draws every scene object that has a model.
pub struct MeshRenderSystem {
    pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
}

impl MeshRenderSystem {
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        global_set_layout: vk::DescriptorSetLayout,
        assets: &AssetConfig,
    ) -> RhiResult<Self> {
        let push_range = vk::PushConstantRange::default()
            .stage_flags(PUSH_STAGES)
            .offset(0)
            .size(MeshPushConstants::SIZE as u32);

        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[global_set_layout], &[push_range])?;

        let config = PipelineConfigInfo {
            pipeline_layout: pipeline_layout.handle(),
            render_pass,
            ..Default::default()
        };

        let pipeline = Pipeline::new(
            device,
            &assets.shader(VERTEX_SHADER),
            &assets.shader(FRAGMENT_SHADER),
            &config,
        )?;

        info!("Mesh render system ready");

        Ok(Self {
            pipeline,
            pipeline_layout,
        })
    }
}

impl RenderSystem for MeshRenderSystem {
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
            let Some(model) = &object.model else {
                continue;
            };

            let push = MeshPushConstants {
                model_matrix: object.transform.mat4(),
                normal_matrix: object.transform.normal_matrix(),
            };
            cmd.push_constants(layout, PUSH_STAGES, 0, &push);

            model.bind(cmd);
            model.draw(cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_constants_size() {
        assert_eq!(MeshPushConstants::SIZE, 128);
    }

    #[test]
    fn test_push_stages() {
        assert_eq!(
            PUSH_STAGES,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
        );
    }
}
