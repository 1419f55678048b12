//! Vertex formats, CPU geometry and GPU meshes.
//!
//! # Vertex Layout
//!
//! [`Vertex3d`] is 32 bytes per vertex:
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | uv        | Float32x2 | 12     | 1               |
//! | normal    | Float32x3 | 20     | 2               |
//!
//! Instance matrices, when present, occupy locations 3–6 (see
//! [`InstanceRaw`](crate::InstanceRaw)).
//!
//! # Built-in geometry
//!
//! [`cube_vertices`], [`plane_vertices`], [`vegetation_quad`] and
//! [`skybox_positions`] produce non-indexed triangle lists with
//! counter-clockwise front faces. UVs follow the bottom-left origin
//! convention; pair them with textures loaded with `flip_vertically`.

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;
use crate::instance::InstanceBuffer;

/// A vertex with position, texture coordinates and normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex3d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 20,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub fn new(position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            normal,
        }
    }
}

/// Layout for position-only vertex buffers (skybox).
pub const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 12,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    }],
};

/// Geometry on the CPU. An empty index list means a plain triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMesh {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl RawMesh {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Replace normals with area-weighted averages of the adjacent face normals.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0; 3];
        }

        let triangles: Vec<[usize; 3]> = if self.indices.is_empty() {
            (0..self.vertices.len() / 3)
                .map(|t| [3 * t, 3 * t + 1, 3 * t + 2])
                .collect()
        } else {
            self.indices
                .chunks_exact(3)
                .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
                .filter(|tri| tri.iter().all(|&i| i < self.vertices.len()))
                .collect()
        };

        for [i0, i1, i2] in triangles {
            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            // |cross| is twice the face area, which weights the average
            let face_normal = (p1 - p0).cross(p2 - p0);
            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.to_array();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().to_array();
        }
    }

    /// Number of vertices a draw call consumes.
    pub fn element_count(&self) -> u32 {
        if self.indices.is_empty() {
            self.vertices.len() as u32
        } else {
            self.indices.len() as u32
        }
    }
}

/// Geometry uploaded to the GPU. Buffers live as long as the mesh.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: Option<wgpu::Buffer>,
    pub(crate) count: u32,
}

impl Mesh {
    pub fn new(gpu: &GpuContext, raw: &RawMesh, label: &str) -> Self {
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: bytemuck::cast_slice(&raw.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = (!raw.indices.is_empty()).then(|| {
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} Indices")),
                    contents: bytemuck::cast_slice(&raw.indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        });

        Self {
            vertex_buffer,
            index_buffer,
            count: raw.element_count(),
        }
    }

    /// Non-indexed mesh from a triangle list.
    pub fn from_vertices(gpu: &GpuContext, vertices: Vec<Vertex3d>, label: &str) -> Self {
        Self::new(gpu, &RawMesh::new(vertices, Vec::new()), label)
    }

    /// Position-only triangle list, drawn with [`POSITION_LAYOUT`].
    pub fn from_positions(gpu: &GpuContext, positions: &[[f32; 3]], label: &str) -> Self {
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Positions")),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Self {
            vertex_buffer,
            index_buffer: None,
            count: positions.len() as u32,
        }
    }

    pub fn cube(gpu: &GpuContext) -> Self {
        Self::from_vertices(gpu, cube_vertices(), "Cube")
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record one draw of the whole mesh. The pipeline must already be set.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw_instances(pass, 0..1);
    }

    /// Record one draw covering every instance in `instances` (vertex slot 1).
    pub fn draw_instanced(&self, pass: &mut wgpu::RenderPass<'_>, instances: &InstanceBuffer) {
        if instances.is_empty() {
            return;
        }
        pass.set_vertex_buffer(1, instances.buffer().slice(..));
        self.draw_instances(pass, 0..instances.len());
    }

    fn draw_instances(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        match &self.index_buffer {
            Some(indices) => {
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.count, 0, instances);
            }
            None => pass.draw(0..self.count, instances),
        }
    }
}

/// Two triangles spanning `centre ± u ± v`, wound so `u × v` faces out.
fn quad(centre: Vec3, u: Vec3, v: Vec3, uv_scale: [f32; 2]) -> [Vertex3d; 6] {
    let normal = u.cross(v).normalize().to_array();
    let corner = |s: f32, t: f32| {
        Vertex3d::new(
            (centre + u * (s * 2.0 - 1.0) + v * (t * 2.0 - 1.0)).to_array(),
            [s * uv_scale[0], t * uv_scale[1]],
            normal,
        )
    };
    [
        corner(0.0, 0.0),
        corner(1.0, 0.0),
        corner(1.0, 1.0),
        corner(1.0, 1.0),
        corner(0.0, 1.0),
        corner(0.0, 0.0),
    ]
}

/// Unit cube centred on the origin: 36 vertices, one texture per face.
pub fn cube_vertices() -> Vec<Vertex3d> {
    let h = 0.5;
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    faces
        .into_iter()
        .flat_map(|(normal, u, v)| quad(normal * h, u * h, v * h, [1.0, 1.0]))
        .collect()
}

/// Horizontal square at `y`, `2 * half_extent` wide, facing +Y, texture
/// repeated `uv_repeat` times along each side.
pub fn plane_vertices(half_extent: f32, y: f32, uv_repeat: f32) -> Vec<Vertex3d> {
    quad(
        Vec3::new(0.0, y, 0.0),
        Vec3::X * half_extent,
        Vec3::NEG_Z * half_extent,
        [uv_repeat, uv_repeat],
    )
    .to_vec()
}

/// Upright unit quad for billboard-style foliage, hanging from its left edge
/// at x = 0 and centred on y = 0.
pub fn vegetation_quad() -> Vec<Vertex3d> {
    quad(
        Vec3::new(0.5, 0.0, 0.0),
        Vec3::X * 0.5,
        Vec3::Y * 0.5,
        [1.0, 1.0],
    )
    .to_vec()
}

/// Inward-agnostic cube of side 2 for skyboxes (positions only).
pub fn skybox_positions() -> Vec<[f32; 3]> {
    cube_vertices()
        .into_iter()
        .map(|v| (Vec3::from(v.position) * 2.0).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(tri: &[Vertex3d]) -> Vec3 {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|v| Vec3::from(v.position));
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn vertex_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Vertex3d>(), 32);
        assert_eq!(Vertex3d::LAYOUT.array_stride, 32);
    }

    #[test]
    fn cube_has_36_outward_ccw_vertices() {
        let cube = cube_vertices();
        assert_eq!(cube.len(), 36);
        for tri in cube.chunks(3) {
            let normal = Vec3::from(tri[0].normal);
            assert!(face_normal(tri).abs_diff_eq(normal, 1e-6));
            // each face sits half a unit out along its normal
            let centre = tri.iter().map(|v| Vec3::from(v.position)).sum::<Vec3>() / 3.0;
            assert!(centre.dot(normal) > 0.0);
        }
        let raw = RawMesh::new(cube, Vec::new());
        assert_eq!(
            raw.bounds(),
            Some((Vec3::splat(-0.5), Vec3::splat(0.5)))
        );
    }

    #[test]
    fn plane_faces_up_and_repeats_uvs() {
        let plane = plane_vertices(5.0, -0.5, 10.0);
        assert_eq!(plane.len(), 6);
        for tri in plane.chunks(3) {
            assert!(face_normal(tri).abs_diff_eq(Vec3::Y, 1e-6));
        }
        assert!(plane.iter().all(|v| v.position[1] == -0.5));
        let max_uv = plane.iter().map(|v| v.uv[0]).fold(0.0, f32::max);
        assert_eq!(max_uv, 10.0);
        let raw = RawMesh::new(plane, Vec::new());
        assert_eq!(
            raw.bounds(),
            Some((Vec3::new(-5.0, -0.5, -5.0), Vec3::new(5.0, -0.5, 5.0)))
        );
    }

    #[test]
    fn vegetation_quad_spans_unit_width() {
        let raw = RawMesh::new(vegetation_quad(), Vec::new());
        assert_eq!(
            raw.bounds(),
            Some((Vec3::new(0.0, -0.5, 0.0), Vec3::new(1.0, 0.5, 0.0)))
        );
        assert!(raw.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn skybox_spans_minus_one_to_one() {
        let positions = skybox_positions();
        assert_eq!(positions.len(), 36);
        assert!(positions.iter().flatten().all(|c| c.abs() == 1.0));
    }

    #[test]
    fn recalculated_normals_match_winding() {
        let mut raw = RawMesh::new(
            vec![
                Vertex3d::new([0.0, 0.0, 0.0], [0.0; 2], [0.0; 3]),
                Vertex3d::new([1.0, 0.0, 0.0], [0.0; 2], [0.0; 3]),
                Vertex3d::new([0.0, 0.0, -1.0], [0.0; 2], [0.0; 3]),
            ],
            vec![0, 1, 2],
        );
        raw.recalculate_normals();
        assert!(raw.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));

        let mut cube = RawMesh::new(cube_vertices(), Vec::new());
        let expected: Vec<[f32; 3]> = cube.vertices.iter().map(|v| v.normal).collect();
        cube.recalculate_normals();
        for (v, n) in cube.vertices.iter().zip(expected) {
            assert!(Vec3::from(v.normal).abs_diff_eq(Vec3::from(n), 1e-6));
        }
    }

    #[test]
    fn element_count_prefers_indices() {
        let vertices = vegetation_quad();
        assert_eq!(RawMesh::new(vertices.clone(), Vec::new()).element_count(), 6);
        assert_eq!(RawMesh::new(vertices, vec![0, 1, 2]).element_count(), 3);
        assert_eq!(RawMesh::default().bounds(), None);
    }
}
