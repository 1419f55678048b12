use std::rc::Rc;

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::entity::{Renderable, Transform};
use crate::gpu::GpuContext;
use crate::instance::InstanceBuffer;
use crate::light::{DirectionalLight, LightColor};
use crate::mesh::{Mesh, vegetation_quad};
use crate::primitives::{Cube, Plane, PrimitiveMeshes};
use crate::scatter::{XzRect, scatter_xz, translations};
use crate::shader::Shader;
use crate::skybox::Skybox;
use crate::texture::{Texture, TextureOptions};

use super::{FrameContext, Scene, apply_camera, environment_shader, lit_shader};

const VEGETATION_COUNT: usize = 2000;
const SHININESS: f32 = 32.0;
const SCATTER_SEED: u64 = 0x65_6e_76;
const MIRROR_POSITION: Vec3 = Vec3::new(0.0, 5.0, 0.0);
const GLASS_POSITION: Vec3 = Vec3::new(3.0, 5.0, 0.0);

/// Spin about Y for the two environment cubes. Flipped on X and Z so they
/// hang upside down.
pub fn cube_rotation(time: f32) -> Vec3 {
    Vec3::new(180.0, (time * 0.05).sin() * 360.0, 180.0)
}

/// A grass meadow under a skybox, with one mirrored and one glass cube
/// floating above it that both sample the skybox cubemap.
pub struct EnvironmentMappingScene {
    lit: Shader,
    lit_instanced: Shader,
    reflection: Shader,
    refraction: Shader,
    sun: DirectionalLight,
    skybox: Skybox,
    terrain: Texture,
    grass: Texture,
    plane: Plane,
    vegetation: Rc<Mesh>,
    instances: InstanceBuffer,
    mirror: Cube,
    glass: Cube,
}

impl EnvironmentMappingScene {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs) -> Self {
        let format = gpu.format();
        let meshes = PrimitiveMeshes::new(gpu);

        let rect = XzRect::new(-5.3, 4.3, -5.0, 5.0);
        let points = scatter_xz(rect, VEGETATION_COUNT, &mut StdRng::seed_from_u64(SCATTER_SEED));

        Self {
            lit: lit_shader(gpu, dirs, format, false),
            lit_instanced: lit_shader(gpu, dirs, format, true),
            reflection: environment_shader(gpu, dirs, format, "reflection.frag"),
            refraction: environment_shader(gpu, dirs, format, "refraction.frag"),
            sun: DirectionalLight::default()
                .with_direction(Vec3::new(-0.2, -1.0, -1.0))
                .with_color(LightColor::new(0.4, 0.8, 0.5)),
            skybox: Skybox::new(
                gpu,
                dirs,
                &dirs.cubemap_faces("skybox/scythian_tombs", "png"),
                format,
            ),
            terrain: Texture::from_file(
                gpu,
                &dirs.texture("forrest_ground_01/forrest_ground_01_diff_1k.jpg"),
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
            mirror: meshes.cube(Transform::new().position(MIRROR_POSITION)),
            glass: meshes.cube(Transform::new().position(GLASS_POSITION)),
        }
    }
}

impl Scene for EnvironmentMappingScene {
    fn initial_camera(&self) -> Camera {
        Camera::default().at(Vec3::new(1.5, 5.0, 10.0))
    }

    fn update(&mut self, dt: f32, time: f32, _camera: &Camera) {
        self.plane.update(dt);
        for cube in [&mut self.mirror, &mut self.glass] {
            cube.transform_mut().rotation = cube_rotation(time);
            cube.update(dt);
        }
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
        for shader in [&mut self.reflection, &mut self.refraction] {
            apply_camera(shader, camera);
            shader.set_texture("skybox", self.skybox.cubemap());
        }

        let mut pass = frame.begin_main_pass();
        self.skybox.render(gpu, &mut pass, camera);

        self.lit.set_texture("material.texture_diffuse1", &self.terrain);
        self.plane.render(gpu, &mut pass, &mut self.lit);

        let shader = &mut self.lit_instanced;
        shader.set_mat4("model", glam::Mat4::IDENTITY);
        shader.set_texture("material.texture_diffuse1", &self.grass);
        if shader.bind(gpu, &mut pass) {
            self.vegetation.draw_instanced(&mut pass, &self.instances);
        }

        self.mirror.render(gpu, &mut pass, &mut self.reflection);
        self.glass.render(gpu, &mut pass, &mut self.refraction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubes_start_flipped_and_swing_a_full_turn() {
        assert_eq!(cube_rotation(0.0), Vec3::new(180.0, 0.0, 180.0));
        let quarter = std::f32::consts::FRAC_PI_2 / 0.05;
        approx::assert_abs_diff_eq!(cube_rotation(quarter).y, 360.0, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(cube_rotation(-quarter).y, -360.0, epsilon = 1e-3);
    }
}
