//! Built-in drawables: textured cubes, planes, floors and light markers.
//!
//! GPU geometry is uploaded once per [`PrimitiveMeshes`] and shared by every
//! instance through `Rc`, so a scene with a dozen cubes owns one vertex
//! buffer.

use std::rc::Rc;

use glam::Vec3;

use crate::entity::{Entity, Renderable, Transform};
use crate::gpu::GpuContext;
use crate::light::PointLight;
use crate::mesh::{Mesh, cube_vertices, plane_vertices};
use crate::shader::Shader;

/// Plane: ±5 at y = -0.5 with the texture repeated 10 times.
pub const PLANE_UV_REPEAT: f32 = 10.0;
/// Floor: ±5 at y = -0.5 with the texture repeated 5 times.
pub const FLOOR_UV_REPEAT: f32 = 5.0;
pub const FLOOR_SCALE: Vec3 = Vec3::new(10.0, 1.0, 10.0);

/// Shared vertex buffers for the built-in shapes.
pub struct PrimitiveMeshes {
    pub cube: Rc<Mesh>,
    pub plane: Rc<Mesh>,
    pub floor: Rc<Mesh>,
}

impl PrimitiveMeshes {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            cube: Rc::new(Mesh::from_vertices(gpu, cube_vertices(), "Cube")),
            plane: Rc::new(Mesh::from_vertices(
                gpu,
                plane_vertices(5.0, -0.5, PLANE_UV_REPEAT),
                "Plane",
            )),
            floor: Rc::new(Mesh::from_vertices(
                gpu,
                plane_vertices(5.0, -0.5, FLOOR_UV_REPEAT),
                "Floor",
            )),
        }
    }

    pub fn cube(&self, transform: Transform) -> Cube {
        Cube(MeshEntity::new(self.cube.clone(), transform))
    }

    pub fn plane(&self, transform: Transform) -> Plane {
        Plane(MeshEntity::new(self.plane.clone(), transform))
    }

    /// Floor at `position` with the default (10, 1, 10) scale.
    pub fn floor(&self, position: Vec3) -> Floor {
        Floor(MeshEntity::new(
            self.floor.clone(),
            Transform::new().position(position).scale(FLOOR_SCALE),
        ))
    }

    pub fn light_cube(&self, light: PointLight) -> LightCube {
        LightCube::new(self.cube.clone(), light)
    }
}

struct MeshEntity {
    entity: Entity,
    mesh: Rc<Mesh>,
}

impl MeshEntity {
    fn new(mesh: Rc<Mesh>, transform: Transform) -> Self {
        Self {
            entity: Entity::new(transform),
            mesh,
        }
    }

    fn render(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, shader: &mut Shader) {
        shader.set_mat4("model", self.entity.model());
        if shader.bind(gpu, pass) {
            self.mesh.draw(pass);
        }
    }
}

macro_rules! mesh_entity {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {$(
        $(#[$meta])*
        pub struct $name(MeshEntity);

        impl Renderable for $name {
            fn entity(&self) -> &Entity {
                &self.0.entity
            }

            fn entity_mut(&mut self) -> &mut Entity {
                &mut self.0.entity
            }

            fn render(
                &self,
                gpu: &GpuContext,
                pass: &mut wgpu::RenderPass<'_>,
                shader: &mut Shader,
            ) {
                self.0.render(gpu, pass, shader);
            }
        }
    )*};
}

mesh_entity! {
    /// Unit cube, 36 vertices.
    Cube,
    /// Textured ground quad.
    Plane,
    /// Large ground quad, scaled (10, 1, 10) by default.
    Floor,
}

/// A small cube drawn in its light's diffuse colour at the light's position.
///
/// The cube follows the light: [`Renderable::update`] moves the transform so
/// the cube's centre lands on the light position whatever its scale.
pub struct LightCube {
    entity: Entity,
    mesh: Rc<Mesh>,
    pub light: PointLight,
}

impl LightCube {
    pub fn new(mesh: Rc<Mesh>, light: PointLight) -> Self {
        let entity = Entity::new(Transform::new().position(light.position));
        Self {
            entity,
            mesh,
            light,
        }
    }
}

impl Renderable for LightCube {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn update(&mut self, dt: f32) {
        let scale = self.entity.transform.scale;
        self.entity.transform.position = marker_translation(self.light.position, scale);
        self.entity.update(dt);
    }

    fn render(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, shader: &mut Shader) {
        shader.set_mat4("model", self.entity.model());
        shader.set_vec3("lightColor", self.light.color.diffuse);
        if shader.bind(gpu, pass) {
            self.mesh.draw(pass);
        }
    }
}

/// Translation that puts a scaled marker's origin at `target`.
///
/// [`Transform::matrix`] scales after translating, so the translation is
/// pre-divided by the scale. Zero-scale axes keep the raw coordinate.
fn marker_translation(target: Vec3, scale: Vec3) -> Vec3 {
    Vec3::select(scale.cmpeq(Vec3::ZERO), target, target / scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_marker_is_centred_on_its_light() {
        let light = Vec3::new(5.0, 2.0, 0.0);
        let scale = Vec3::splat(0.3);
        let mut marker = Entity::new(Transform::new().scale(scale));
        marker.transform.position = marker_translation(light, scale);
        marker.update(0.0);

        let centre = marker.model().transform_point3(Vec3::ZERO);
        assert!(centre.abs_diff_eq(light, 1e-5), "got {centre}");
        // the marker itself is still shrunk
        let corner = marker.model().transform_point3(Vec3::splat(0.5));
        assert!(corner.abs_diff_eq(light + Vec3::splat(0.15), 1e-5), "got {corner}");
    }

    #[test]
    fn unscaled_marker_uses_the_light_position() {
        let light = Vec3::new(-1.0, 4.0, 2.5);
        assert_eq!(marker_translation(light, Vec3::ONE), light);
        assert_eq!(
            marker_translation(light, Vec3::new(2.0, 0.0, 0.5)),
            Vec3::new(-0.5, 4.0, 5.0)
        );
    }
}
