//! Cubemap background drawn behind everything else.

use std::path::Path;

use glam::{Mat3, Mat4};

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, skybox_positions};
use crate::shader::{DepthOptions, PipelineOptions, Shader, VertexInput};
use crate::texture::{Texture, TextureKind};
use crate::uniform::ShaderLayout;

pub struct Skybox {
    cubemap: Texture,
    mesh: Mesh,
    shader: Shader,
}

impl Skybox {
    /// `faces` in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn new(
        gpu: &GpuContext,
        dirs: &ResourceDirs,
        faces: &[impl AsRef<Path>; 6],
        format: wgpu::TextureFormat,
    ) -> Self {
        let layout = ShaderLayout::new()
            .mat4("view")
            .mat4("projection")
            .texture("skybox", TextureKind::Cube);
        // Drawn at depth 1 (xyww), so it must pass against a cleared buffer.
        let options = PipelineOptions::lit(format)
            .vertex_input(VertexInput::Positions)
            .depth(Some(DepthOptions::LESS_EQUAL_READ_ONLY));
        Self {
            cubemap: Texture::cubemap(gpu, faces),
            mesh: Mesh::from_positions(gpu, &skybox_positions(), "Skybox"),
            shader: Shader::load(gpu, dirs, "skybox.vert", "skybox.frag", layout, options),
        }
    }

    pub fn cubemap(&self) -> &Texture {
        &self.cubemap
    }

    pub fn render(&mut self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, camera: &Camera) {
        self.shader.set_mat4("view", rotation_only(camera.view_matrix()));
        self.shader.set_mat4("projection", camera.projection_matrix());
        self.shader.set_texture("skybox", &self.cubemap);
        if self.shader.bind(gpu, pass) {
            self.mesh.draw(pass);
        }
    }
}

/// `view` with its translation removed, so the box stays centred on the eye.
pub fn rotation_only(view: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn translation_is_stripped() {
        let camera = Camera::default().at(Vec3::new(10.0, -4.0, 3.0)).facing(-45.0, 20.0);
        let view = rotation_only(camera.view_matrix());
        assert_eq!(view.w_axis, glam::Vec4::W);
        // direction vectors are still rotated the same way
        let d = Vec3::new(0.3, 0.5, -1.0);
        assert!(view
            .transform_vector3(d)
            .abs_diff_eq(camera.view_matrix().transform_vector3(d), 1e-5));
    }
}
