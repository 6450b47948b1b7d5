//! Transform component for scene objects.
//!
//! Rotation is stored as Tait-Bryan angles in radians and applied in Y, X, Z
//! order, so `rotation.y` is yaw, `rotation.x` pitch and `rotation.z` roll.
//!
//! # Example
//!
//! ```
//! use ember_scene::TransformComponent;
//! use glam::Vec3;
//!
//! let transform = TransformComponent::new()
//!     .with_translation(Vec3::new(1.0, 0.0, 0.0))
//!     .with_scale(Vec3::new(3.0, 1.5, 3.0));
//!
//! let world = transform.mat4().transform_point3(Vec3::ZERO);
//! assert!((world - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
//! ```

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// Translation, Y-X-Z euler rotation and non-uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformComponent {
    pub translation: Vec3,
    /// Radians, applied yaw (y) then pitch (x) then roll (z).
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl TransformComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Rotation as a quaternion, `Ry * Rx * Rz`.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y,
            self.rotation.x,
            self.rotation.z,
        )
    }

    /// Model matrix: translate * Ry * Rx * Rz * scale.
    pub fn mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.translation)
    }

    /// Inverse transpose of the upper 3x3 of [`mat4`](Self::mat4), widened
    /// to a `Mat4` for push-constant alignment.
    ///
    /// Equal to `R * S^-1`. A transform with a zero scale component has no
    /// inverse; identity is returned instead of NaNs.
    pub fn normal_matrix(&self) -> Mat4 {
        const EPSILON: f32 = 1e-6;

        let linear = Mat3::from_quat(self.orientation()) * Mat3::from_diagonal(self.scale);
        if linear.determinant().abs() < EPSILON {
            return Mat4::IDENTITY;
        }

        Mat4::from_mat3(linear.inverse().transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    #[test]
    fn test_transform_default() {
        let t = TransformComponent::default();
        assert_eq!(t.translation, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.mat4(), Mat4::IDENTITY);
    }

    #[test]
    fn test_mat4_applies_scale_then_rotation_then_translation() {
        let t = TransformComponent::new()
            .with_translation(Vec3::new(0.0, 0.0, 5.0))
            .with_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0))
            .with_scale(Vec3::new(2.0, 1.0, 1.0));

        // +X scaled to 2, yawed 90 degrees onto -Z, then moved to z = 5
        let p = t.mat4().transform_point3(Vec3::X);
        assert!(approx_eq_vec3(p, Vec3::new(0.0, 0.0, 3.0)), "got {p}");
    }

    #[test]
    fn test_rotation_order_is_yxz() {
        let rotation = Vec3::new(0.3, 0.7, 0.2);
        let t = TransformComponent::new().with_rotation(rotation);

        let expected = Mat4::from_rotation_y(rotation.y)
            * Mat4::from_rotation_x(rotation.x)
            * Mat4::from_rotation_z(rotation.z);

        let v = Vec3::new(0.5, -1.0, 2.0);
        assert!(approx_eq_vec3(
            t.mat4().transform_vector3(v),
            expected.transform_vector3(v)
        ));
    }

    #[test]
    fn test_normal_matrix_identity() {
        assert_eq!(TransformComponent::default().normal_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        let t = TransformComponent::new().with_scale(Vec3::new(3.0, 1.5, 3.0));
        let normal = t.normal_matrix();

        assert!(approx_eq_vec3(
            normal.transform_vector3(Vec3::ONE),
            Vec3::new(1.0 / 3.0, 1.0 / 1.5, 1.0 / 3.0)
        ));
        assert_eq!(normal.w_axis, glam::Vec4::W);
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose_of_model() {
        let t = TransformComponent::new()
            .with_translation(Vec3::new(4.0, -2.0, 1.0))
            .with_rotation(Vec3::new(0.4, 1.1, -0.3))
            .with_scale(Vec3::new(3.0, 1.5, 3.0));

        let expected = Mat3::from_mat4(t.mat4()).inverse().transpose();
        let normal = Mat3::from_mat4(t.normal_matrix());
        for (a, b) in normal.to_cols_array().iter().zip(expected.to_cols_array()) {
            assert!((a - b).abs() < EPSILON);
        }
    }

    #[test]
    fn test_normal_matrix_non_invertible() {
        let t = TransformComponent::new().with_scale(Vec3::new(1.0, 0.0, 1.0));
        let normal = t.normal_matrix();

        assert_eq!(normal, Mat4::IDENTITY);
        assert!(!normal.is_nan());
    }
}
