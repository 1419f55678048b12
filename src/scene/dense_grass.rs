use std::rc::Rc;

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::entity::{Renderable, Transform};
use crate::gpu::GpuContext;
use crate::instance::InstanceBuffer;
use crate::light::DirectionalLight;
use crate::mesh::{Mesh, vegetation_quad};
use crate::primitives::{Plane, PrimitiveMeshes};
use crate::render_target::{RenderTarget, ScreenQuad, ScreenEffect};
use crate::scatter::{XzRect, scatter_xz, translations};
use crate::shader::Shader;
use crate::texture::{Texture, TextureOptions};

use super::{FrameContext, Scene, apply_camera, lit_shader};

pub const VEGETATION_COUNT: usize = 2000;
/// Off-screen resolution; the screen pass scales it to the window.
pub const TARGET_WIDTH: u32 = 2560;
pub const TARGET_HEIGHT: u32 = 1440;
const SHININESS: f32 = 32.0;
const SCATTER_SEED: u64 = 0x67_72_61_73_73;

/// A meadow of instanced grass quads rendered off-screen, then copied to
/// the window through a post-processing pass.
pub struct DenseGrassScene {
    lit: Shader,
    lit_instanced: Shader,
    sun: DirectionalLight,
    terrain: Texture,
    grass: Texture,
    plane: Plane,
    vegetation: Rc<Mesh>,
    instances: InstanceBuffer,
    target: RenderTarget,
    screen: ScreenQuad,
}

impl DenseGrassScene {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs) -> Self {
        Self::with_effect(gpu, dirs, ScreenEffect::None)
    }

    pub fn with_effect(gpu: &GpuContext, dirs: &ResourceDirs, effect: ScreenEffect) -> Self {
        let format = gpu.format();
        let meshes = PrimitiveMeshes::new(gpu);

        let rect = XzRect::new(-5.3, 4.3, -5.0, 5.0);
        let points = scatter_xz(rect, VEGETATION_COUNT, &mut StdRng::seed_from_u64(SCATTER_SEED));
        log::debug!("scattered {} grass quads", points.len());

        let mut screen = ScreenQuad::new(gpu, dirs, format);
        screen.effect = effect;

        Self {
            lit: lit_shader(gpu, dirs, format, false),
            lit_instanced: lit_shader(gpu, dirs, format, true),
            sun: DirectionalLight::default(),
            terrain: Texture::from_file(
                gpu,
                &dirs.texture("TerrainGrassTexture.jpg"),
                &TextureOptions::default(),
            ),
            grass: Texture::from_file(
                gpu,
                &dirs.texture("grass.png"),
                &TextureOptions::default().clamp_to_edge(),
            ),
            plane: meshes.plane(Transform::new()),
            vegetation: Rc::new(Mesh::from_vertices(gpu, vegetation_quad(), "Vegetation")),
            instances: InstanceBuffer::new(gpu, &translations(&points)),
            target: RenderTarget::new(gpu, TARGET_WIDTH, TARGET_HEIGHT, format, "Grass Target"),
            screen,
        }
    }
}

impl Scene for DenseGrassScene {
    fn initial_camera(&self) -> Camera {
        Camera::default().at(Vec3::new(0.0, 1.0, 8.0))
    }

    fn update(&mut self, dt: f32, _time: f32, _camera: &Camera) {
        self.plane.update(dt);
    }

    fn render(&mut self, frame: &mut FrameContext<'_>) {
        let gpu = frame.gpu;
        let camera = frame.camera;

        for shader in [&mut self.lit, &mut self.lit_instanced] {
            apply_camera(shader, camera);
            shader.set_float("material.shininess", SHININESS);
            shader.set_bool("shadowsEnabled", false);
            shader.set_bool("pointLightEnabled", false);
            self.sun.apply(shader, "dirLight");
        }

        {
            let mut pass = self.target.begin_pass(frame.encoder, frame.clear_color);

            self.lit.set_texture("material.texture_diffuse1", &self.terrain);
            self.plane.render(gpu, &mut pass, &mut self.lit);

            let shader = &mut self.lit_instanced;
            shader.set_mat4("model", glam::Mat4::IDENTITY);
            shader.set_texture("material.texture_diffuse1", &self.grass);
            if shader.bind(gpu, &mut pass) {
                self.vegetation.draw_instanced(&mut pass, &self.instances);
            }
        }

        let mut pass = frame.begin_main_pass();
        self.screen.draw(gpu, &mut pass, &self.target.color);
    }
}
