//! Spatial state shared by everything that gets drawn.
//!
//! An [`Entity`] is a [`Transform`] plus the model matrix derived from it.
//! Concrete drawables (cubes, floors, loaded models, light markers) embed an
//! `Entity` and implement [`Renderable`].
//!
//! # Matrix order
//!
//! [`Transform::matrix`] composes `S · T · Rx · Ry · Rz`. Applied to a column
//! vector this rotates about z, then y, then x, translates, and only then
//! scales, so the translation itself is scaled:
//!
//! ```
//! use caruti::{Transform, Vec3};
//!
//! let t = Transform::new()
//!     .position(Vec3::new(1.0, 0.0, 0.0))
//!     .scale(Vec3::new(2.0, 1.0, 1.0));
//! assert_eq!(t.matrix().transform_point3(Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0));
//! ```

use glam::{Mat4, Vec3};

use crate::gpu::GpuContext;
use crate::shader::Shader;

/// Position, Euler rotation in degrees, and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation about the x, y and z axes, in degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, degrees: Vec3) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(self, scale: f32) -> Self {
        self.scale(Vec3::splat(scale))
    }

    /// `S · T · Rx · Ry · Rz`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale(self.scale)
            * Mat4::from_translation(self.position)
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
    }
}

/// A transform and its cached model matrix.
///
/// The matrix is rebuilt from scratch on every [`Entity::update`]; nothing
/// tracks whether the transform changed.
#[derive(Clone, Copy, Debug)]
pub struct Entity {
    pub transform: Transform,
    model: Mat4,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new(Transform::default())
    }
}

impl Entity {
    pub fn new(transform: Transform) -> Self {
        Self {
            model: transform.matrix(),
            transform,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(Transform::new().position(position))
    }

    /// Rebuild the model matrix. `dt` is available to animating wrappers.
    pub fn update(&mut self, _dt: f32) {
        self.model = self.transform.matrix();
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }
}

/// Something with a transform that can be updated and drawn.
///
/// `render` writes the entity's `model` uniform, binds `shader` and records
/// its draw into `pass`. Scene code sets every other uniform beforehand.
pub trait Renderable {
    fn entity(&self) -> &Entity;

    fn entity_mut(&mut self) -> &mut Entity;

    fn update(&mut self, dt: f32) {
        self.entity_mut().update(dt);
    }

    fn render(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, shader: &mut Shader);

    fn transform(&self) -> &Transform {
        &self.entity().transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.entity_mut().transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transform_is_identity() {
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
        assert_eq!(Entity::default().model(), Mat4::IDENTITY);
        assert_eq!(
            Transform::new().uniform_scale(3.0).matrix(),
            Mat4::from_scale(Vec3::splat(3.0))
        );
    }

    #[test]
    fn composition_order_is_fixed() {
        // Scale (2,1,1), rotate 90° about Y, translate (1,0,0).
        // Ry: (0.5,0,0) -> (0,0,-0.5); T: -> (1,0,-0.5); S: -> (2,0,-0.5).
        let transform = Transform::new()
            .position(Vec3::new(1.0, 0.0, 0.0))
            .rotation(Vec3::new(0.0, 90.0, 0.0))
            .scale(Vec3::new(2.0, 1.0, 1.0));
        let world = transform.matrix().transform_point3(Vec3::new(0.5, 0.0, 0.0));
        assert!(
            world.abs_diff_eq(Vec3::new(2.0, 0.0, -0.5), 1e-6),
            "got {world}"
        );
    }

    #[test]
    fn rotations_apply_z_first() {
        // Rz(90) sends X to Y, then Rx(90) sends Y to Z.
        let transform = Transform::new().rotation(Vec3::new(90.0, 0.0, 90.0));
        let p = transform.matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Z, 1e-6), "got {p}");
    }

    #[test]
    fn update_is_idempotent() {
        let mut entity = Entity::new(
            Transform::new()
                .position(Vec3::new(3.25, -1.5, 7.0))
                .rotation(Vec3::new(12.0, 45.0, -33.0))
                .scale(Vec3::new(0.1, 2.0, 5.0)),
        );
        entity.update(0.016);
        let first = entity.model();
        for _ in 0..10 {
            entity.update(0.5);
        }
        assert_eq!(first.to_cols_array(), entity.model().to_cols_array());
    }

    #[test]
    fn update_picks_up_transform_changes() {
        let mut entity = Entity::at(Vec3::ZERO);
        entity.transform.position = Vec3::new(0.0, 4.0, 0.0);
        assert_eq!(entity.model(), Mat4::IDENTITY);
        entity.update(0.0);
        assert_eq!(entity.model().w_axis.truncate(), Vec3::new(0.0, 4.0, 0.0));
    }
}
