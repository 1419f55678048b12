use glam::{Mat4, Vec3};

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::instance::InstanceBuffer;
use crate::light::{DirectionalLight, LightColor};
use crate::model::Model;
use crate::scatter::AsteroidRing;
use crate::shader::Shader;
use crate::skybox::Skybox;

use super::{FrameContext, Scene, apply_camera, lit_shader};

const SHININESS: f32 = 32.0;

/// A planet inside a ring of instanced rocks against a space skybox.
/// The ring drifts while `sin(0.05 t)` is positive.
pub struct AsteroidFieldScene {
    lit: Shader,
    lit_instanced: Shader,
    sun: DirectionalLight,
    skybox: Skybox,
    planet: Model,
    rock: Model,
    ring: AsteroidRing,
    instances: InstanceBuffer,
    pending: Option<Vec<Mat4>>,
}

impl AsteroidFieldScene {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs) -> Self {
        let format = gpu.format();
        let ring = AsteroidRing::default();
        let instances = InstanceBuffer::new(gpu, &ring.matrices(0.0));

        Self {
            lit: lit_shader(gpu, dirs, format, false),
            lit_instanced: lit_shader(gpu, dirs, format, true),
            sun: DirectionalLight::default()
                .with_direction(Vec3::new(-0.2, -1.0, -1.0))
                .with_color(LightColor::new(0.1, 0.8, 0.5)),
            skybox: Skybox::new(gpu, dirs, &dirs.cubemap_faces("skybox/space", "png"), format),
            planet: Model::load(gpu, &dirs.model("planet/planet.obj")),
            rock: Model::load(gpu, &dirs.model("rock/rock.obj")),
            ring,
            instances,
            pending: None,
        }
    }
}

impl Scene for AsteroidFieldScene {
    fn initial_camera(&self) -> Camera {
        Camera::default().at(Vec3::new(0.0, 10.0, 90.0)).facing(-90.0, -5.0)
    }

    fn update(&mut self, _dt: f32, time: f32, _camera: &Camera) {
        // Uploaded in render, where the GPU context is available.
        self.pending = Some(self.ring.matrices(AsteroidRing::orbit_at(time)));
    }

    fn render(&mut self, frame: &mut FrameContext<'_>) {
        let gpu = frame.gpu;
        let camera = frame.camera;

        if let Some(matrices) = self.pending.take() {
            self.instances.update(gpu, &matrices);
        }

        for shader in [&mut self.lit, &mut self.lit_instanced] {
            apply_camera(shader, camera);
            shader.set_float("material.shininess", SHININESS);
            shader.set_bool("shadowsEnabled", false);
            shader.set_bool("pointLightEnabled", false);
            self.sun.apply(shader, "dirLight");
        }

        let mut pass = frame.begin_main_pass();
        self.skybox.render(gpu, &mut pass, camera);

        self.lit.set_mat4(
            "model",
            Mat4::from_translation(Vec3::new(0.0, -3.0, 0.0)) * Mat4::from_scale(Vec3::splat(4.0)),
        );
        self.planet.draw(gpu, &mut pass, &mut self.lit);

        self.lit_instanced.set_mat4("model", Mat4::IDENTITY);
        self.rock
            .draw_instanced(gpu, &mut pass, &mut self.lit_instanced, &self.instances);
    }
}
