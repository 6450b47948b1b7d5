//! Graphics pipeline and pipeline layout management.
//!
//! - [`PipelineConfigInfo`] is plain data describing every fixed-function
//!   stage. Render systems start from [`PipelineConfigInfo::default`] and
//!   override what they need before building.
//! - [`PipelineLayout`] wraps VkPipelineLayout.
//! - [`Pipeline`] wraps a VkPipeline built against a render pass.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use ember_rhi::device::Device;
//! use ember_rhi::pipeline::{Pipeline, PipelineConfigInfo, PipelineLayout};
//! use ember_rhi::vk;
//!
//! # fn example(device: Arc<Device>, render_pass: vk::RenderPass) -> Result<(), ember_rhi::RhiError> {
//! let layout = PipelineLayout::new(device.clone(), &[], &[])?;
//!
//! let mut config = PipelineConfigInfo::default();
//! config.render_pass = render_pass;
//! config.pipeline_layout = layout.handle();
//!
//! let pipeline = Pipeline::new(
//!     device,
//!     Path::new("shaders/mesh.vert.spv"),
//!     Path::new("shaders/mesh.frag.spv"),
//!     &config,
//! )?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::command::CommandBuffer;
use crate::device::Device;
use crate::error::RhiResult;
use crate::shader::{Shader, ShaderStage};
use crate::vertex::Vertex;

/// Vulkan pipeline layout wrapper.
///
/// Describes the descriptor set layouts and push constant ranges a pipeline
/// may access.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Creates a new pipeline layout.
    ///
    /// # Errors
    ///
    /// Returns an error if pipeline layout creation fails.
    pub fn new(
        device: Arc<Device>,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!(
            "Created pipeline layout with {} descriptor set layout(s) and {} push constant range(s)",
            descriptor_set_layouts.len(),
            push_constant_ranges.len()
        );

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Fixed-function state for a graphics pipeline.
///
/// Defaults: triangle list, filled polygons, no culling, clockwise front
/// face, single sample, blending off, depth test and write with `LESS`,
/// dynamic viewport and scissor, and the [`Vertex`] input layout.
/// `pipeline_layout` and `render_pass` start null and must be set by the
/// caller.
#[derive(Clone, Debug)]
pub struct PipelineConfigInfo {
    pub binding_descriptions: Vec<vk::VertexInputBindingDescription>,
    pub attribute_descriptions: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart_enable: bool,
    pub polygon_mode: vk::PolygonMode,
    pub line_width: f32,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_bias_enable: bool,
    pub rasterization_samples: vk::SampleCountFlags,
    pub color_blend_attachment: vk::PipelineColorBlendAttachmentState,
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: vk::CompareOp,
    pub dynamic_states: Vec<vk::DynamicState>,
    pub pipeline_layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
}

impl Default for PipelineConfigInfo {
    fn default() -> Self {
        Self {
            binding_descriptions: Vertex::binding_descriptions(),
            attribute_descriptions: Vertex::attribute_descriptions(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart_enable: false,
            polygon_mode: vk::PolygonMode::FILL,
            line_width: 1.0,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::CLOCKWISE,
            depth_bias_enable: false,
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            color_blend_attachment: vk::PipelineColorBlendAttachmentState {
                blend_enable: vk::FALSE,
                src_color_blend_factor: vk::BlendFactor::ONE,
                dst_color_blend_factor: vk::BlendFactor::ZERO,
                color_blend_op: vk::BlendOp::ADD,
                src_alpha_blend_factor: vk::BlendFactor::ONE,
                dst_alpha_blend_factor: vk::BlendFactor::ZERO,
                alpha_blend_op: vk::BlendOp::ADD,
                color_write_mask: vk::ColorComponentFlags::RGBA,
            },
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: vk::CompareOp::LESS,
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            pipeline_layout: vk::PipelineLayout::null(),
            render_pass: vk::RenderPass::null(),
            subpass: 0,
        }
    }
}

impl PipelineConfigInfo {
    /// Drops the vertex input layout, for pipelines that generate their
    /// geometry in the vertex shader.
    pub fn without_vertex_input(mut self) -> Self {
        self.binding_descriptions.clear();
        self.attribute_descriptions.clear();
        self
    }

    /// Panics if the layout or render pass is still null.
    pub fn validate(&self) {
        assert!(
            self.pipeline_layout != vk::PipelineLayout::null(),
            "pipeline layout must be set"
        );
        assert!(
            self.render_pass != vk::RenderPass::null(),
            "render pass must be set"
        );
    }
}

/// A graphics pipeline built from a vertex and fragment SPIR-V pair.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    /// Builds a graphics pipeline from two SPIR-V files and `config`.
    ///
    /// The shader modules only live for the duration of this call.
    ///
    /// # Panics
    ///
    /// Panics if `config.pipeline_layout` or `config.render_pass` is null.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ShaderNotFound`](crate::RhiError::ShaderNotFound)
    /// when either file is missing, or the Vulkan error if creation fails.
    pub fn new(
        device: Arc<Device>,
        vert_path: &Path,
        frag_path: &Path,
        config: &PipelineConfigInfo,
    ) -> RhiResult<Self> {
        config.validate();

        let vertex_shader = Shader::from_spirv_file(device.clone(), vert_path, ShaderStage::Vertex)?;
        let fragment_shader =
            Shader::from_spirv_file(device.clone(), frag_path, ShaderStage::Fragment)?;

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&config.binding_descriptions)
            .vertex_attribute_descriptions(&config.attribute_descriptions);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(config.topology)
            .primitive_restart_enable(config.primitive_restart_enable);

        // Viewport and scissor are dynamic
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(config.polygon_mode)
            .line_width(config.line_width)
            .cull_mode(config.cull_mode)
            .front_face(config.front_face)
            .depth_bias_enable(config.depth_bias_enable);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(config.rasterization_samples)
            .min_sample_shading(1.0);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(config.depth_test_enable)
            .depth_write_enable(config.depth_write_enable)
            .depth_compare_op(config.depth_compare_op)
            .depth_bounds_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0)
            .stencil_test_enable(false);

        let blend_attachments = [config.color_blend_attachment];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&blend_attachments);

        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&config.dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(config.pipeline_layout)
            .render_pass(config.render_pass)
            .subpass(config.subpass);

        let pipeline = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, result)| result)?[0]
        };

        info!(
            "Graphics pipeline created from {} and {}",
            vert_path.display(),
            frag_path.display()
        );

        Ok(Self { device, pipeline })
    }

    /// Binds this pipeline at the graphics bind point.
    pub fn bind(&self, cmd: &CommandBuffer) {
        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.pipeline);
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        info!("Graphics pipeline destroyed");
    }
}
