//! Directional shadow mapping.
//!
//! A frame with shadows records two passes: [`ShadowMap::render`] draws the
//! shadow casters depth-only from the light, then the lit pass samples
//! [`ShadowMap::texture`] through the `shadowMap` slot with the same
//! [`ShadowProjection::light_space_matrix`].

use glam::{Mat4, Vec3};

use crate::gpu::GpuContext;
use crate::texture::Texture;

/// Default shadow map resolution.
pub const SHADOW_WIDTH: u32 = 2560;
pub const SHADOW_HEIGHT: u32 = 1440;

/// Orthographic light frustum looking from `eye` at `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowProjection {
    /// Half the width and height of the frustum's cross-section.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl ShadowProjection {
    pub fn new(eye: Vec3, half_extent: f32, near: f32, far: f32) -> Self {
        Self {
            half_extent,
            near,
            far,
            eye,
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    /// Light placed `scalar` units back along `direction`, shifted by
    /// `offset`, looking at the origin.
    pub fn from_direction(
        direction: Vec3,
        scalar: f32,
        offset: Vec3,
        half_extent: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self::new(-direction * scalar + offset, half_extent, near, far)
    }

    pub fn projection(&self) -> Mat4 {
        let h = self.half_extent;
        Mat4::orthographic_rh(-h, h, -h, h, self.near, self.far)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// World → light clip space. Depth lands in 0..1.
    pub fn light_space_matrix(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Depth texture plus the pass that fills it.
pub struct ShadowMap {
    texture: Texture,
}

impl ShadowMap {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        Self {
            texture: Texture::depth(gpu, width, height, "Shadow Map"),
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Clear the map to the far plane and run `draw` inside a depth-only
    /// pass targeting it. `draw` binds a depth-only shader and issues the
    /// caster draws.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        draw: impl FnOnce(&mut wgpu::RenderPass<'_>),
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.texture.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        draw(&mut pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn wood_floor() -> ShadowProjection {
        ShadowProjection::new(Vec3::new(-2.0, 15.0, -1.0), 50.0, 1.0, 50.0)
    }

    #[test]
    fn target_maps_to_centre_at_its_distance() {
        let clip = wood_floor()
            .light_space_matrix()
            .project_point3(Vec3::ZERO);
        assert_abs_diff_eq!(clip.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(clip.y, 0.0, epsilon = 1e-5);
        // |eye| = sqrt(230)
        assert_abs_diff_eq!(clip.z, (230f32.sqrt() - 1.0) / 49.0, epsilon = 1e-5);
    }

    #[test]
    fn near_and_far_planes_bound_depth() {
        let projection = wood_floor();
        let forward = (projection.target - projection.eye).normalize();
        let m = projection.light_space_matrix();
        let near = m.project_point3(projection.eye + forward * projection.near);
        let far = m.project_point3(projection.eye + forward * projection.far);
        assert_abs_diff_eq!(near.z, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(far.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn frustum_edges_hit_clip_edges() {
        // looking straight down needs an up vector other than +Y
        let projection = ShadowProjection {
            up: Vec3::NEG_Z,
            ..ShadowProjection::new(Vec3::new(0.0, 10.0, 0.0), 50.0, 1.0, 50.0)
        };
        let clip = projection
            .light_space_matrix()
            .project_point3(Vec3::new(50.0, 0.0, 0.0));
        assert_abs_diff_eq!(clip.x.abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn directional_eye_is_behind_the_light() {
        let projection = ShadowProjection::from_direction(
            Vec3::new(-0.2, -1.0, -0.3),
            30.0,
            Vec3::splat(40.0),
            200.0,
            1.0,
            100.0,
        );
        assert!(projection.eye.abs_diff_eq(Vec3::new(46.0, 70.0, 49.0), 1e-5));
        assert_eq!(projection.target, Vec3::ZERO);
    }
}
