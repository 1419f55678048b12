//! Demo scenes and the contract the run loop drives them through.
//!
//! A [`Scene`] builds its shaders, textures and entities up front, then gets
//! one [`Scene::update`] and one [`Scene::render`] call per frame. Shadow
//! passes, off-screen targets and skyboxes come from the shared helpers in
//! the crate root rather than being rebuilt per scene.

mod asteroid_field;
mod dense_grass;
mod environment_mapping;
mod sponza;
mod transparent_windows;
mod wood_floor;

pub use asteroid_field::AsteroidFieldScene;
pub use dense_grass::DenseGrassScene;
pub use environment_mapping::EnvironmentMappingScene;
pub use sponza::SponzaScene;
pub use transparent_windows::TransparentWindowsScene;
pub use wood_floor::WoodFloorScene;

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::render_target::begin_pass;
use crate::shader::{PipelineOptions, Shader};
use crate::texture::TextureKind;
use crate::uniform::ShaderLayout;

/// One demo composition.
pub trait Scene {
    /// Where the camera starts.
    fn initial_camera(&self) -> Camera {
        Camera::default()
    }

    /// Advance animation state. Runs before [`Scene::render`] every frame.
    fn update(&mut self, _dt: f32, _time: f32, _camera: &Camera) {}

    /// Record this frame's passes into `frame.encoder`.
    fn render(&mut self, frame: &mut FrameContext<'_>);
}

/// Everything a scene needs to record one frame.
pub struct FrameContext<'a> {
    pub gpu: &'a GpuContext,
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Swapchain image for this frame.
    pub target: &'a wgpu::TextureView,
    /// Depth buffer matching `target`.
    pub depth: &'a wgpu::TextureView,
    pub camera: &'a Camera,
    pub clear_color: wgpu::Color,
    /// Seconds since start.
    pub time: f32,
    pub dt: f32,
}

impl FrameContext<'_> {
    /// Begin the on-screen pass, clearing colour and depth.
    pub fn begin_main_pass(&mut self) -> wgpu::RenderPass<'_> {
        begin_pass(
            self.encoder,
            "Main Pass",
            self.target,
            Some(self.depth),
            Some(self.clear_color),
        )
    }
}

/// Uniform layout shared by `lit.vert`, `lit_instanced.vert` and `lit.frag`.
///
/// Field order mirrors the WGSL `Uniforms` struct; scalars fill the padding
/// after each `vec3`.
pub fn lit_layout() -> ShaderLayout {
    ShaderLayout::new()
        .mat4("model")
        .mat4("camera")
        .mat4("lightSpaceMatrix")
        .vec3("cameraPos")
        .float("material.shininess")
        .vec3("dirLight.direction")
        .bool("shadowsEnabled")
        .vec3("dirLight.ambient")
        .bool("pointLightEnabled")
        .vec3("dirLight.diffuse")
        .float("pointLight.constant")
        .vec3("dirLight.specular")
        .float("pointLight.linear")
        .vec3("pointLight.position")
        .float("pointLight.quadratic")
        .vec3("pointLight.ambient")
        .vec3("pointLight.diffuse")
        .vec3("pointLight.specular")
        .texture("material.texture_diffuse1", TextureKind::D2)
        .texture("material.texture_specular1", TextureKind::D2)
        .texture("shadowMap", TextureKind::Depth)
}

/// Phong shader with a directional light, an optional point light and an
/// optional shadow map.
pub fn lit_shader(
    gpu: &GpuContext,
    dirs: &ResourceDirs,
    format: wgpu::TextureFormat,
    instanced: bool,
) -> Shader {
    let (vertex, options) = if instanced {
        ("lit_instanced.vert", PipelineOptions::lit(format).instanced())
    } else {
        ("lit.vert", PipelineOptions::lit(format))
    };
    Shader::load(gpu, dirs, vertex, "lit.frag", lit_layout(), options)
}

/// [`lit_shader`] with source-over alpha blending, for glass and other
/// see-through surfaces. Draw its geometry back to front.
pub fn blended_lit_shader(
    gpu: &GpuContext,
    dirs: &ResourceDirs,
    format: wgpu::TextureFormat,
) -> Shader {
    let options = PipelineOptions::lit(format).blend(wgpu::BlendState::ALPHA_BLENDING);
    Shader::load(gpu, dirs, "lit.vert", "lit.frag", lit_layout(), options)
}

/// Uniforms shared by `environment.vert`, `reflection.frag` and
/// `refraction.frag`.
pub fn environment_layout() -> ShaderLayout {
    ShaderLayout::new()
        .mat4("model")
        .mat4("camera")
        .vec3("cameraPos")
        .texture("skybox", TextureKind::Cube)
}

/// Mirror (`reflection.frag`) or glass (`refraction.frag`) surface that
/// samples a cubemap along the view ray.
pub fn environment_shader(
    gpu: &GpuContext,
    dirs: &ResourceDirs,
    format: wgpu::TextureFormat,
    fragment: &str,
) -> Shader {
    Shader::load(
        gpu,
        dirs,
        "environment.vert",
        fragment,
        environment_layout(),
        PipelineOptions::lit(format),
    )
}

/// Depth-only shader for shadow passes.
pub fn depth_shader(gpu: &GpuContext, dirs: &ResourceDirs) -> Shader {
    let layout = ShaderLayout::new().mat4("model").mat4("lightSpaceMatrix");
    Shader::load(
        gpu,
        dirs,
        "depth.vert",
        "depth.frag",
        layout,
        PipelineOptions::depth_only(),
    )
}

/// Flat-coloured shader for light markers.
pub fn light_source_shader(
    gpu: &GpuContext,
    dirs: &ResourceDirs,
    format: wgpu::TextureFormat,
) -> Shader {
    let layout = ShaderLayout::new()
        .mat4("model")
        .mat4("camera")
        .vec3("lightColor");
    Shader::load(
        gpu,
        dirs,
        "light_source.vert",
        "light_source.frag",
        layout,
        PipelineOptions::lit(format),
    )
}

/// Write the camera uniforms every camera-aware shader here shares.
pub fn apply_camera(shader: &mut Shader, camera: &Camera) {
    shader.set_mat4("camera", camera.camera_matrix());
    shader.set_vec3("cameraPos", camera.position);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_layout_matches_wgsl_struct() {
        let layout = lit_layout();
        assert_eq!(layout.offset_of("cameraPos"), Some(192));
        assert_eq!(layout.offset_of("material.shininess"), Some(204));
        assert_eq!(layout.offset_of("shadowsEnabled"), Some(220));
        assert_eq!(layout.offset_of("pointLight.position"), Some(272));
        assert_eq!(layout.offset_of("pointLight.diffuse"), Some(304));
        assert_eq!(layout.offset_of("pointLight.specular"), Some(320));
        assert_eq!(layout.block_size(), 336);
        assert_eq!(layout.texture_index("shadowMap"), Some(2));
    }

    #[test]
    fn environment_layout_matches_wgsl_struct() {
        let layout = environment_layout();
        assert_eq!(layout.offset_of("camera"), Some(64));
        assert_eq!(layout.offset_of("cameraPos"), Some(128));
        assert_eq!(layout.block_size(), 144);
        assert_eq!(layout.textures()[0].kind, TextureKind::Cube);
    }
}
