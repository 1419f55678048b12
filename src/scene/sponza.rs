use glam::{Mat4, Vec3};

use crate::assets::ResourceDirs;
use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::light::{DirectionalLight, LightColor};
use crate::model::Model;
use crate::render_target::DepthDebugQuad;
use crate::shader::Shader;
use crate::shadow::{SHADOW_HEIGHT, SHADOW_WIDTH, ShadowMap, ShadowProjection};

use super::{FrameContext, Scene, apply_camera, depth_shader, light_source_shader, lit_shader};

const SPONZA_SCALE: f32 = 0.1;
const SHININESS: f32 = 32.0;

/// Shadow frustum placement, relative to the sun direction.
#[derive(Clone, Copy, Debug)]
pub struct SunRig {
    pub direction_scalar: f32,
    pub eye_offset: Vec3,
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for SunRig {
    fn default() -> Self {
        Self {
            direction_scalar: 30.0,
            eye_offset: Vec3::splat(40.0),
            half_extent: 200.0,
            near: 1.0,
            far: 100.0,
        }
    }
}

impl SunRig {
    pub fn projection(&self, direction: Vec3) -> ShadowProjection {
        ShadowProjection::from_direction(
            direction,
            self.direction_scalar,
            self.eye_offset,
            self.half_extent,
            self.near,
            self.far,
        )
    }
}

/// The Sponza atrium lit by a shadow-casting sun, with the sun model drawn
/// at the shadow camera's eye.
pub struct SponzaScene {
    lit: Shader,
    depth: Shader,
    light_source: Shader,
    debug_quad: DepthDebugQuad,
    shadow_map: ShadowMap,
    sun: DirectionalLight,
    rig: SunRig,
    sponza: Model,
    sun_model: Model,
}

impl SponzaScene {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs) -> Self {
        let format = gpu.format();
        Self {
            lit: lit_shader(gpu, dirs, format, false),
            depth: depth_shader(gpu, dirs),
            light_source: light_source_shader(gpu, dirs, format),
            debug_quad: DepthDebugQuad::new(gpu, dirs, format),
            shadow_map: ShadowMap::new(gpu, SHADOW_WIDTH, SHADOW_HEIGHT),
            sun: DirectionalLight::default().with_color(LightColor::new(0.1, 0.7, 0.5)),
            rig: SunRig::default(),
            sponza: Model::load(gpu, &dirs.model("sponza/sponza.obj")),
            sun_model: Model::load(gpu, &dirs.model("Sun.glb")),
        }
    }
}

impl Scene for SponzaScene {
    fn initial_camera(&self) -> Camera {
        Camera::default().at(Vec3::new(0.0, 15.0, 0.0)).facing(0.0, 0.0)
    }

    fn render(&mut self, frame: &mut FrameContext<'_>) {
        let gpu = frame.gpu;
        let camera = frame.camera;
        let projection = self.rig.projection(self.sun.direction);
        let light_space = projection.light_space_matrix();
        let model = Mat4::from_scale(Vec3::splat(SPONZA_SCALE));

        self.depth.set_mat4("lightSpaceMatrix", light_space);
        self.depth.set_mat4("model", model);
        let (depth, sponza) = (&mut self.depth, &self.sponza);
        self.shadow_map.render(frame.encoder, |pass| {
            sponza.draw(gpu, pass, depth);
        });

        let lit = &mut self.lit;
        apply_camera(lit, camera);
        lit.set_mat4("model", model);
        lit.set_mat4("lightSpaceMatrix", light_space);
        lit.set_float("material.shininess", SHININESS);
        lit.set_bool("shadowsEnabled", true);
        lit.set_bool("pointLightEnabled", false);
        self.sun.apply(lit, "dirLight");
        lit.set_texture("shadowMap", self.shadow_map.texture());

        let mut pass = frame.begin_main_pass();

        self.light_source.set_mat4("camera", camera.camera_matrix());
        self.light_source.set_mat4("model", Mat4::from_translation(projection.eye));
        self.light_source.set_vec3("lightColor", Vec3::new(1.0, 0.9, 0.6));
        self.sun_model.draw(gpu, &mut pass, &mut self.light_source);

        self.sponza.draw(gpu, &mut pass, &mut self.lit);

        self.debug_quad.draw(gpu, &mut pass, self.shadow_map.texture());
    }
}
