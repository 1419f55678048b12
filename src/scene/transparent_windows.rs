use std::rc::Rc;

use glam::{Mat4, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::entity::{Renderable, Transform};
use crate::gpu::GpuContext;
use crate::light::DirectionalLight;
use crate::mesh::{Mesh, vegetation_quad};
use crate::primitives::{Plane, PrimitiveMeshes};
use crate::scatter::{XzRect, back_to_front, scatter_xz};
use crate::shader::Shader;
use crate::texture::{Texture, TextureOptions};

use super::{FrameContext, Scene, apply_camera, blended_lit_shader, lit_shader};

pub const WINDOW_COUNT: usize = 50;
const SHININESS: f32 = 32.0;
const SCATTER_SEED: u64 = 0x77_69_6e;

/// Semi-transparent window panes standing on a grass plane.
///
/// The panes are blended over whatever is behind them, so every frame they
/// are re-sorted by distance to the camera and drawn farthest first.
pub struct TransparentWindowsScene {
    lit: Shader,
    blended: Shader,
    sun: DirectionalLight,
    terrain: Texture,
    window: Texture,
    plane: Plane,
    pane: Rc<Mesh>,
    windows: Vec<Vec3>,
}

impl TransparentWindowsScene {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs) -> Self {
        let format = gpu.format();
        let meshes = PrimitiveMeshes::new(gpu);
        let rect = XzRect::new(-5.3, 4.3, -5.0, 5.0);

        Self {
            lit: lit_shader(gpu, dirs, format, false),
            blended: blended_lit_shader(gpu, dirs, format),
            sun: DirectionalLight::default(),
            terrain: Texture::from_file(
                gpu,
                &dirs.texture("TerrainGrassTexture.jpg"),
                &TextureOptions::default(),
            ),
            window: Texture::from_file(
                gpu,
                &dirs.texture("blending_transparent_window.png"),
                &TextureOptions::default().clamp_to_edge(),
            ),
            plane: meshes.plane(Transform::new()),
            pane: Rc::new(Mesh::from_vertices(gpu, vegetation_quad(), "Window")),
            windows: scatter_xz(rect, WINDOW_COUNT, &mut StdRng::seed_from_u64(SCATTER_SEED)),
        }
    }
}

impl Scene for TransparentWindowsScene {
    fn initial_camera(&self) -> Camera {
        Camera::default().at(Vec3::new(0.0, 1.0, 8.0))
    }

    fn update(&mut self, dt: f32, _time: f32, _camera: &Camera) {
        self.plane.update(dt);
    }

    fn render(&mut self, frame: &mut FrameContext<'_>) {
        let gpu = frame.gpu;
        let camera = frame.camera;

        for shader in [&mut self.lit, &mut self.blended] {
            apply_camera(shader, camera);
            shader.set_float("material.shininess", SHININESS);
            shader.set_bool("shadowsEnabled", false);
            shader.set_bool("pointLightEnabled", false);
            self.sun.apply(shader, "dirLight");
        }

        let mut pass = frame.begin_main_pass();

        self.lit.set_texture("material.texture_diffuse1", &self.terrain);
        self.plane.render(gpu, &mut pass, &mut self.lit);

        // Opaque geometry first, then the panes far to near.
        self.blended.set_texture("material.texture_diffuse1", &self.window);
        for position in back_to_front(&self.windows, camera.position) {
            self.blended.set_mat4("model", Mat4::from_translation(position));
            if self.blended.bind(gpu, &mut pass) {
                self.pane.draw(&mut pass);
            }
        }
    }
}
