//! Per-frame context handed to render systems.

use ash::vk;

use ember_rhi::command::CommandBuffer;
use ember_scene::{Camera, GameObjects};

/// Everything a render system needs to update and record one frame.
///
/// Only lives for the duration of a single frame.
pub struct FrameInfo<'a> {
    /// Frame-in-flight slot; selects the uniform ring slot.
    pub frame_index: usize,
    /// Seconds since the previous frame.
    pub frame_time: f32,
    pub command_buffer: CommandBuffer,
    pub camera: &'a Camera,
    pub global_descriptor_set: vk::DescriptorSet,
    pub game_objects: &'a mut GameObjects,
}
