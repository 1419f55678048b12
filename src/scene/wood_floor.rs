use glam::Vec3;

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::entity::{Renderable, Transform};
use crate::gpu::GpuContext;
use crate::light::{DirectionalLight, LightColor, PointLight};
use crate::primitives::{Cube, Floor, LightCube, PrimitiveMeshes};
use crate::render_target::DepthDebugQuad;
use crate::shader::Shader;
use crate::shadow::{SHADOW_HEIGHT, SHADOW_WIDTH, ShadowMap, ShadowProjection};
use crate::texture::{Texture, TextureOptions};

use super::{FrameContext, Scene, apply_camera, depth_shader, light_source_shader, lit_shader};

const CUBE_POSITIONS: [Vec3; 9] = [
    Vec3::new(3.0, 3.0, 0.0),
    Vec3::new(6.0, 3.0, 0.0),
    Vec3::new(9.0, 3.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(-3.0, 3.0, 0.0),
    Vec3::new(-6.0, 3.0, 0.0),
    Vec3::new(-9.0, 3.0, 0.0),
    Vec3::new(-12.0, 3.0, 0.0),
    Vec3::new(-15.0, 3.0, 0.0),
];

const LIGHT_CUBE_HEIGHT: f32 = 2.0;
const SHININESS: f32 = 2.0;

/// Wood floor with a row of cubes, a directional shadow and a point light
/// marker bobbing above the floor.
pub struct WoodFloorScene {
    lit: Shader,
    depth: Shader,
    light_source: Shader,
    debug_quad: DepthDebugQuad,
    shadow_map: ShadowMap,
    projection: ShadowProjection,
    sun: DirectionalLight,
    wood: Texture,
    floor: Floor,
    cubes: Vec<Cube>,
    light_cube: LightCube,
}

impl WoodFloorScene {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs) -> Self {
        let format = gpu.format();
        let meshes = PrimitiveMeshes::new(gpu);

        let light = PointLight::new("Point Light 0", Vec3::new(5.0, LIGHT_CUBE_HEIGHT, 0.0));
        let mut light_cube = meshes.light_cube(light);
        light_cube.transform_mut().scale = Vec3::splat(0.3);

        Self {
            lit: lit_shader(gpu, dirs, format, false),
            depth: depth_shader(gpu, dirs),
            light_source: light_source_shader(gpu, dirs, format),
            debug_quad: DepthDebugQuad::new(gpu, dirs, format),
            shadow_map: ShadowMap::new(gpu, SHADOW_WIDTH, SHADOW_HEIGHT),
            projection: ShadowProjection::new(Vec3::new(-2.0, 15.0, -1.0), 50.0, 1.0, 50.0),
            sun: DirectionalLight::default().with_color(LightColor::new(0.1, 1.0, 0.5)),
            wood: Texture::from_file(
                gpu,
                &dirs.texture("wood_floor_deck/wood_floor_deck_diff.jpg"),
                &TextureOptions::default(),
            ),
            floor: meshes.floor(Vec3::ZERO),
            cubes: CUBE_POSITIONS
                .iter()
                .map(|&p| meshes.cube(Transform::new().position(p)))
                .collect(),
            light_cube,
        }
    }
}

/// Everything lit by the sun and drawn into the shadow map.
fn casters<'s>(floor: &'s Floor, cubes: &'s [Cube]) -> impl Iterator<Item = &'s dyn Renderable> {
    std::iter::once(floor as &dyn Renderable).chain(cubes.iter().map(|c| c as &dyn Renderable))
}

impl Scene for WoodFloorScene {
    fn initial_camera(&self) -> Camera {
        Camera::default().at(Vec3::new(0.0, 6.0, 25.0))
    }

    fn update(&mut self, dt: f32, time: f32, _camera: &Camera) {
        self.light_cube.light.position.y = LIGHT_CUBE_HEIGHT + time.sin();
        self.floor.update(dt);
        for cube in &mut self.cubes {
            cube.update(dt);
        }
        self.light_cube.update(dt);
    }

    fn render(&mut self, frame: &mut FrameContext<'_>) {
        let gpu = frame.gpu;
        let camera = frame.camera;
        let light_space = self.projection.light_space_matrix();

        self.depth.set_mat4("lightSpaceMatrix", light_space);
        let depth = &mut self.depth;
        let (floor, cubes) = (&self.floor, &self.cubes);
        self.shadow_map.render(frame.encoder, |pass| {
            for caster in casters(floor, cubes) {
                caster.render(gpu, pass, depth);
            }
        });

        let lit = &mut self.lit;
        apply_camera(lit, camera);
        lit.set_mat4("lightSpaceMatrix", light_space);
        lit.set_bool("shadowsEnabled", true);
        lit.set_float("material.shininess", SHININESS);
        self.sun.apply(lit, "dirLight");
        lit.set_bool("pointLightEnabled", true);
        self.light_cube.light.apply(lit, "pointLight");
        lit.set_texture("material.texture_diffuse1", &self.wood);
        lit.set_texture("shadowMap", self.shadow_map.texture());

        let mut pass = frame.begin_main_pass();
        for entity in casters(&self.floor, &self.cubes) {
            entity.render(gpu, &mut pass, &mut self.lit);
        }

        self.light_source.set_mat4("camera", camera.camera_matrix());
        self.light_cube.render(gpu, &mut pass, &mut self.light_source);

        self.debug_quad.draw(gpu, &mut pass, self.shadow_map.texture());
    }
}
