//! Camera projection and view matrices.
//!
//! Projections use Vulkan's `[0, 1]` depth range. Clip space Y points down,
//! so scenes treat -Y as up and no flip is applied to the projection.

use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};

/// Default up vector for view construction.
pub const WORLD_UP: Vec3 = Vec3::NEG_Y;

/// Projection plus cached view and inverse view matrices.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box projection; `top` maps to clip -1 and `bottom` to +1.
    pub fn set_orthographic_projection(
        &mut self,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Mat4::orthographic_lh(left, right, top, bottom, near, far);
    }

    /// Perspective looking down +Z, depth `near -> 0`, `far -> 1`.
    pub fn set_perspective_projection(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        assert!(aspect.abs() > f32::EPSILON, "aspect ratio must be non-zero");
        self.projection = Mat4::perspective_lh(fov_y, aspect, near, far);
    }

    /// Looks from `position` along `direction`.
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let w = direction.normalize();
        let u = w.cross(up).normalize();
        let v = w.cross(u);
        self.set_basis(position, u, v, w);
    }

    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.set_view_direction(position, target - position, up);
    }

    /// View from a position and Y-X-Z euler rotation, matching
    /// [`TransformComponent`](crate::TransformComponent) so a viewer object
    /// can drive the camera directly.
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        let orientation = Quat::from_euler(EulerRot::YXZ, rotation.y, rotation.x, rotation.z);
        self.set_basis(
            position,
            orientation * Vec3::X,
            orientation * Vec3::Y,
            orientation * Vec3::Z,
        );
    }

    /// Builds view and inverse view from an orthonormal camera basis.
    fn set_basis(&mut self, position: Vec3, u: Vec3, v: Vec3, w: Vec3) {
        self.view = Mat4::from_cols(
            Vec4::new(u.x, v.x, w.x, 0.0),
            Vec4::new(u.y, v.y, w.y, 0.0),
            Vec4::new(u.z, v.z, w.z, 0.0),
            Vec4::new(-u.dot(position), -v.dot(position), -w.dot(position), 1.0),
        );
        self.inverse_view = Mat4::from_cols(
            u.extend(0.0),
            v.extend(0.0),
            w.extend(0.0),
            position.extend(1.0),
        );
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn inverse_view(&self) -> Mat4 {
        self.inverse_view
    }

    /// World-space camera position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.inverse_view.w_axis.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    #[test]
    fn test_perspective_depth_range() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(50f32.to_radians(), 4.0 / 3.0, 0.1, 100.0);

        let near = camera.projection().project_point3(Vec3::new(0.0, 0.0, 0.1));
        let far = camera.projection().project_point3(Vec3::new(0.0, 0.0, 100.0));
        assert!(near.z.abs() < EPSILON);
        assert!((far.z - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_orthographic_maps_box_to_clip() {
        let mut camera = Camera::new();
        camera.set_orthographic_projection(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);

        let p = camera.projection().project_point3(Vec3::new(1.0, 1.0, 1.0));
        assert!(approx_eq_vec3(p, Vec3::new(1.0, 1.0, 1.0)));

        let p = camera.projection().project_point3(Vec3::new(-1.0, -1.0, -1.0));
        assert!(approx_eq_vec3(p, Vec3::new(-1.0, -1.0, 0.0)));
    }

    #[test]
    fn test_view_moves_eye_to_origin() {
        let mut camera = Camera::new();
        let eye = Vec3::new(0.0, -1.0, -2.5);
        camera.set_view_target(eye, Vec3::ZERO, WORLD_UP);

        assert!(approx_eq_vec3(camera.view().transform_point3(eye), Vec3::ZERO));

        // The target lies straight ahead on +Z
        let target = camera.view().transform_point3(Vec3::ZERO);
        assert!(target.x.abs() < EPSILON && target.y.abs() < EPSILON);
        assert!(target.z > 0.0);
    }

    #[test]
    fn test_inverse_view_is_inverse() {
        let mut camera = Camera::new();
        camera.set_view_yxz(Vec3::new(1.0, -2.0, 3.0), Vec3::new(0.3, 1.2, -0.4));

        let product = camera.view() * camera.inverse_view();
        for (a, b) in product
            .to_cols_array()
            .iter()
            .zip(Mat4::IDENTITY.to_cols_array())
        {
            assert!((a - b).abs() < EPSILON);
        }
        assert!(approx_eq_vec3(camera.position(), Vec3::new(1.0, -2.0, 3.0)));
    }

    #[test]
    fn test_view_yxz_matches_transform() {
        let position = Vec3::new(0.0, 0.0, -2.5);
        let rotation = Vec3::new(0.2, -0.8, 0.1);

        let mut camera = Camera::new();
        camera.set_view_yxz(position, rotation);

        let model = crate::TransformComponent::new()
            .with_translation(position)
            .with_rotation(rotation)
            .mat4();
        let p = Vec3::new(0.5, 0.25, 4.0);
        assert!(approx_eq_vec3(camera.inverse_view().transform_point3(p), model.transform_point3(p)));
    }

    #[test]
    fn test_view_direction_and_yxz_agree_for_forward() {
        let mut a = Camera::new();
        a.set_view_direction(Vec3::ZERO, Vec3::Z, WORLD_UP);
        let mut b = Camera::new();
        b.set_view_yxz(Vec3::ZERO, Vec3::ZERO);

        let p = Vec3::new(0.3, -0.7, 2.0);
        assert!(approx_eq_vec3(a.view().transform_point3(p), b.view().transform_point3(p)));
    }
}
