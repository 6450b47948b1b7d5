//! Keyboard-driven fly controller for the viewer transform.

use std::f32::consts::TAU;

use ember_platform::{InputState, KeyCode};
use glam::Vec3;
use tracing::trace;

use crate::camera::WORLD_UP;
use crate::transform::TransformComponent;

/// Pitch is kept inside this range to avoid flipping over the poles.
pub const MAX_PITCH: f32 = 1.5;

/// Key bindings for [`KeyboardMovementController`].
#[derive(Clone, Copy, Debug)]
pub struct KeyMappings {
    pub move_left: KeyCode,
    pub move_right: KeyCode,
    pub move_forward: KeyCode,
    pub move_backward: KeyCode,
    pub move_up: KeyCode,
    pub move_down: KeyCode,
    pub look_left: KeyCode,
    pub look_right: KeyCode,
    pub look_up: KeyCode,
    pub look_down: KeyCode,
}

impl Default for KeyMappings {
    fn default() -> Self {
        Self {
            move_left: KeyCode::KeyA,
            move_right: KeyCode::KeyD,
            move_forward: KeyCode::KeyW,
            move_backward: KeyCode::KeyS,
            move_up: KeyCode::KeyE,
            move_down: KeyCode::KeyQ,
            look_left: KeyCode::ArrowLeft,
            look_right: KeyCode::ArrowRight,
            look_up: KeyCode::ArrowUp,
            look_down: KeyCode::ArrowDown,
        }
    }
}

/// Moves a transform in the XZ plane and turns it with the arrow keys.
#[derive(Clone, Copy, Debug)]
pub struct KeyboardMovementController {
    pub keys: KeyMappings,
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub look_speed: f32,
}

impl Default for KeyboardMovementController {
    fn default() -> Self {
        Self {
            keys: KeyMappings::default(),
            move_speed: 3.0,
            look_speed: 1.5,
        }
    }
}

impl KeyboardMovementController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one frame of input to `transform`.
    pub fn move_in_plane_xz(&self, input: &InputState, dt: f32, transform: &mut TransformComponent) {
        let keys = &self.keys;

        let rotate = Vec3::new(
            input.axis(keys.look_up, keys.look_down),
            input.axis(keys.look_right, keys.look_left),
            0.0,
        );
        if rotate.length_squared() > f32::EPSILON {
            transform.rotation += self.look_speed * dt * rotate.normalize();
        }

        transform.rotation.x = transform.rotation.x.clamp(-MAX_PITCH, MAX_PITCH);
        transform.rotation.y = transform.rotation.y.rem_euclid(TAU);

        let yaw = transform.rotation.y;
        let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(forward.z, 0.0, -forward.x);

        let direction = forward * input.axis(keys.move_forward, keys.move_backward)
            + right * input.axis(keys.move_right, keys.move_left)
            + WORLD_UP * input.axis(keys.move_up, keys.move_down);

        if direction.length_squared() > f32::EPSILON {
            transform.translation += self.move_speed * dt * direction.normalize();
            trace!("Viewer moved to {}", transform.translation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn pressed(keys: &[KeyCode]) -> InputState {
        let mut input = InputState::new();
        for &key in keys {
            input.on_key_pressed(key);
        }
        input
    }

    #[test]
    fn test_no_input_leaves_transform() {
        let controller = KeyboardMovementController::new();
        let mut transform = TransformComponent::default();
        controller.move_in_plane_xz(&InputState::new(), 0.016, &mut transform);
        assert_eq!(transform, TransformComponent::default());
    }

    #[test]
    fn test_forward_moves_along_plus_z() {
        let controller = KeyboardMovementController::new();
        let mut transform = TransformComponent::default();
        controller.move_in_plane_xz(&pressed(&[KeyCode::KeyW]), 0.5, &mut transform);
        assert!((transform.translation - Vec3::new(0.0, 0.0, 1.5)).length() < EPSILON);
    }

    #[test]
    fn test_up_moves_along_negative_y() {
        let controller = KeyboardMovementController::new();
        let mut transform = TransformComponent::default();
        controller.move_in_plane_xz(&pressed(&[KeyCode::KeyE]), 1.0, &mut transform);
        assert!((transform.translation - Vec3::new(0.0, -3.0, 0.0)).length() < EPSILON);
    }

    #[test]
    fn test_diagonal_speed_is_normalized() {
        let controller = KeyboardMovementController::new();
        let mut transform = TransformComponent::default();
        controller.move_in_plane_xz(&pressed(&[KeyCode::KeyW, KeyCode::KeyD]), 1.0, &mut transform);
        assert!((transform.translation.length() - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let controller = KeyboardMovementController::new();
        let mut transform = TransformComponent::default();
        controller.move_in_plane_xz(&pressed(&[KeyCode::ArrowUp]), 10.0, &mut transform);
        assert_eq!(transform.rotation.x, MAX_PITCH);
    }

    #[test]
    fn test_yaw_wraps() {
        let controller = KeyboardMovementController::new();
        let mut transform = TransformComponent::default();
        controller.move_in_plane_xz(&pressed(&[KeyCode::ArrowLeft]), 1.0, &mut transform);
        assert!(transform.rotation.y >= 0.0 && transform.rotation.y < TAU);
        assert!((transform.rotation.y - (TAU - 1.5)).abs() < EPSILON);
    }
}
