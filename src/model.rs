//! Imported models: geometry plus diffuse/specular material textures.
//!
//! Loading happens in two steps. [`load_model_data`] parses a file into plain
//! [`ModelData`] (no GPU involved, so it is unit-testable), then
//! [`Model::from_data`] uploads meshes and resolves texture references
//! through a [`TextureCache`], so a texture shared by many meshes is decoded
//! and uploaded once.
//!
//! `.obj` files go through `tobj`, `.glb`/`.gltf` through `gltf`. Both are
//! triangulated and have their V coordinate flipped so image row 0 maps to
//! the top of the texture.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glam::Vec3;
use image::DynamicImage;

use crate::entity::{Entity, Renderable};
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::instance::InstanceBuffer;
use crate::mesh::{Mesh, RawMesh, Vertex3d};
use crate::shader::Shader;
use crate::texture::{Texture, TextureKind, TextureOptions};

/// Role of a material texture. Determines its uniform name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialTextureKind {
    Diffuse,
    Specular,
}

impl MaterialTextureKind {
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Diffuse => "texture_diffuse",
            Self::Specular => "texture_specular",
        }
    }
}

/// Where a material texture's pixels come from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureSource {
    /// Image file, already joined with the model's directory.
    File(PathBuf),
    /// Index into [`ModelData::images`].
    Embedded(usize),
}

impl TextureSource {
    /// Key used to de-duplicate loads within one model.
    pub fn cache_key(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().into_owned(),
            Self::Embedded(index) => format!("#embedded{index}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialTexture {
    pub kind: MaterialTextureKind,
    pub source: TextureSource,
}

/// One mesh of an imported model, before upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub mesh: RawMesh,
    pub textures: Vec<MaterialTexture>,
}

/// Everything parsed from a model file.
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    /// Directory texture paths are resolved against.
    pub directory: PathBuf,
    pub meshes: Vec<MeshData>,
    /// Images embedded in the file (glTF only).
    pub images: Vec<DynamicImage>,
}

/// Uniform names for a mesh's textures in binding order:
/// `material.texture_diffuse1`, `material.texture_specular1`,
/// `material.texture_diffuse2`, ... with one counter per kind.
pub fn material_uniform_names(kinds: impl IntoIterator<Item = MaterialTextureKind>) -> Vec<String> {
    let mut counters: HashMap<MaterialTextureKind, u32> = HashMap::new();
    kinds
        .into_iter()
        .map(|kind| {
            let n = counters.entry(kind).or_insert(0);
            *n += 1;
            format!("material.{}{}", kind.type_name(), n)
        })
        .collect()
}

/// Load-once map from a texture path to its loaded value.
#[derive(Debug)]
pub struct TextureCache<T = Rc<Texture>> {
    loaded: HashMap<String, T>,
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self {
            loaded: HashMap::new(),
        }
    }
}

impl<T: Clone> TextureCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value cached under `key`, calling `load` only on a miss.
    pub fn get_or_load(&mut self, key: &str, load: impl FnOnce() -> T) -> T {
        self.loaded.entry(key.to_owned()).or_insert_with(load).clone()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

fn obj_load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Parse a model file into CPU-side data. Dispatches on the extension.
pub fn load_model_data(path: &Path) -> Result<ModelData> {
    let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => {
            if !path.exists() {
                return Err(Error::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "model file not found"),
                ));
            }
            let (models, materials) = tobj::load_obj(path, &obj_load_options())?;
            Ok(obj_to_model_data(models, materials, directory))
        }
        Some("glb" | "gltf") => load_gltf(path, directory),
        _ => Err(Error::UnsupportedModel(path.to_path_buf())),
    }
}

/// Parse OBJ text from a reader. `material_loader` resolves `mtllib` names.
pub fn parse_obj<R, F>(reader: &mut R, directory: &Path, material_loader: F) -> Result<ModelData>
where
    R: BufRead,
    F: Fn(&Path) -> tobj::MTLLoadResult,
{
    let (models, materials) = tobj::load_obj_buf(reader, &obj_load_options(), material_loader)?;
    Ok(obj_to_model_data(models, materials, directory.to_path_buf()))
}

fn obj_to_model_data(
    models: Vec<tobj::Model>,
    materials: std::result::Result<Vec<tobj::Material>, tobj::LoadError>,
    directory: PathBuf,
) -> ModelData {
    let materials = materials.unwrap_or_else(|err| {
        log::warn!("OBJ materials unavailable in {}: {err}", directory.display());
        Vec::new()
    });

    let texture_ref = |kind, name: &Option<String>| {
        name.as_deref().filter(|n| !n.is_empty()).map(|n| MaterialTexture {
            kind,
            source: TextureSource::File(directory.join(n.replace('\\', "/"))),
        })
    };

    let meshes = models
        .into_iter()
        .map(|model| {
            let mesh = model.mesh;
            let vertex_count = mesh.positions.len() / 3;
            let has_normals = mesh.normals.len() == mesh.positions.len();
            let has_uvs = mesh.texcoords.len() / 2 == vertex_count;

            let vertices = (0..vertex_count)
                .map(|i| {
                    let p = &mesh.positions[3 * i..3 * i + 3];
                    let normal = if has_normals {
                        [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
                    } else {
                        [0.0; 3]
                    };
                    let uv = if has_uvs {
                        [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
                    } else {
                        [0.0; 2]
                    };
                    Vertex3d::new([p[0], p[1], p[2]], uv, normal)
                })
                .collect();
            let mut raw = RawMesh::new(vertices, mesh.indices);
            if !has_normals {
                log::warn!("mesh `{}` has no normals, generating them", model.name);
                raw.recalculate_normals();
            }

            let textures = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .map(|material| {
                    texture_ref(MaterialTextureKind::Diffuse, &material.diffuse_texture)
                        .into_iter()
                        .chain(texture_ref(
                            MaterialTextureKind::Specular,
                            &material.specular_texture,
                        ))
                        .collect()
                })
                .unwrap_or_default();

            MeshData {
                name: model.name,
                mesh: raw,
                textures,
            }
        })
        .collect();

    ModelData {
        directory,
        meshes,
        images: Vec::new(),
    }
}

fn load_gltf(path: &Path, directory: PathBuf) -> Result<ModelData> {
    let (document, buffers, images) = gltf::import(path)?;

    let mut data = ModelData {
        directory,
        meshes: Vec::new(),
        images: images.iter().map(gltf_image).collect(),
    };

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            gltf_node(&node, &buffers, &mut data);
        }
    }
    Ok(data)
}

fn gltf_node(node: &gltf::Node<'_>, buffers: &[gltf::buffer::Data], data: &mut ModelData) {
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(mesh_data) = gltf_primitive(&mesh, &primitive, buffers) {
                data.meshes.push(mesh_data);
            }
        }
    }
    for child in node.children() {
        gltf_node(&child, buffers, data);
    }
}

fn gltf_primitive(
    mesh: &gltf::Mesh<'_>,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let uvs: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().collect());

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0; 3]);
            let uv = uvs
                .as_ref()
                .and_then(|uv| uv.get(i).copied())
                .map(|[u, v]| [u, 1.0 - v])
                .unwrap_or([0.0; 2]);
            Vertex3d::new(position, uv, normal)
        })
        .collect();
    let indices = reader
        .read_indices()
        .map(|indices| indices.into_u32().collect())
        .unwrap_or_default();

    let mut raw = RawMesh::new(vertices, indices);
    if normals.is_none() {
        raw.recalculate_normals();
    }

    let material = primitive.material();
    let mut textures = Vec::new();
    // glTF core has no specular map; those meshes sample the placeholder
    if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
        textures.push(MaterialTexture {
            kind: MaterialTextureKind::Diffuse,
            source: TextureSource::Embedded(info.texture().source().index()),
        });
    }

    Some(MeshData {
        name: mesh.name().unwrap_or_default().to_owned(),
        mesh: raw,
        textures,
    })
}

fn gltf_image(image: &gltf::image::Data) -> DynamicImage {
    use gltf::image::Format;

    let (w, h, pixels) = (image.width, image.height, image.pixels.clone());
    let decoded = match image.format {
        Format::R8 => image::GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
        Format::R8G8 => image::GrayAlphaImage::from_raw(w, h, pixels).map(DynamicImage::ImageLumaA8),
        Format::R8G8B8 => image::RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        Format::R8G8B8A8 => image::RgbaImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8),
        other => {
            log::warn!("unsupported embedded image format {other:?}");
            None
        }
    };
    decoded.unwrap_or_else(|| DynamicImage::new_rgba8(1, 1))
}

struct ModelMesh {
    mesh: Mesh,
    /// Uniform name and texture, in binding order.
    textures: Vec<(String, Rc<Texture>)>,
}

/// A model uploaded to the GPU.
pub struct Model {
    meshes: Vec<ModelMesh>,
}

impl Model {
    pub fn try_load(gpu: &GpuContext, path: &Path) -> Result<Self> {
        let data = load_model_data(path)?;
        let model = Self::from_data(gpu, &data, &path.display().to_string());
        log::info!(
            "loaded model {} ({} meshes)",
            path.display(),
            model.mesh_count()
        );
        Ok(model)
    }

    /// Like [`Model::try_load`], but logs failures and returns an empty model.
    pub fn load(gpu: &GpuContext, path: &Path) -> Self {
        Self::try_load(gpu, path).unwrap_or_else(|err| {
            log::error!("model failed to load: {err}");
            Self { meshes: Vec::new() }
        })
    }

    pub fn from_data(gpu: &GpuContext, data: &ModelData, label: &str) -> Self {
        let mut cache = TextureCache::new();
        let options = TextureOptions::model();

        let meshes = data
            .meshes
            .iter()
            .filter(|mesh| !mesh.mesh.is_empty())
            .map(|mesh_data| {
                let names = material_uniform_names(mesh_data.textures.iter().map(|t| t.kind));
                let textures = mesh_data
                    .textures
                    .iter()
                    .zip(names)
                    .map(|(material, name)| {
                        let texture = cache.get_or_load(&material.source.cache_key(), || {
                            Rc::new(load_material_texture(gpu, data, &material.source, &options))
                        });
                        (name, texture)
                    })
                    .collect();
                ModelMesh {
                    mesh: Mesh::new(gpu, &mesh_data.mesh, &format!("{label}/{}", mesh_data.name)),
                    textures,
                }
            })
            .collect();

        Self { meshes }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Draw every mesh with its own material textures. The caller sets
    /// `model` and every other uniform beforehand.
    pub fn draw(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, shader: &mut Shader) {
        for mesh in &self.meshes {
            if self.bind_mesh(gpu, pass, shader, mesh) {
                mesh.mesh.draw(pass);
            }
        }
    }

    /// Like [`Model::draw`], one instanced draw per mesh.
    pub fn draw_instanced(
        &self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        shader: &mut Shader,
        instances: &InstanceBuffer,
    ) {
        for mesh in &self.meshes {
            if self.bind_mesh(gpu, pass, shader, mesh) {
                mesh.mesh.draw_instanced(pass, instances);
            }
        }
    }

    fn bind_mesh(
        &self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        shader: &mut Shader,
        mesh: &ModelMesh,
    ) -> bool {
        for (name, texture) in &mesh.textures {
            shader.set_texture(name, texture);
        }
        shader.bind(gpu, pass)
    }
}

fn load_material_texture(
    gpu: &GpuContext,
    data: &ModelData,
    source: &TextureSource,
    options: &TextureOptions,
) -> Texture {
    match source {
        TextureSource::File(path) => Texture::from_file(gpu, path, options),
        TextureSource::Embedded(index) => match data.images.get(*index) {
            Some(image) => Texture::from_image(
                gpu,
                image.clone(),
                &format!("{}#{index}", data.directory.display()),
                options,
            ),
            None => {
                log::error!("embedded image {index} missing");
                Texture::placeholder(gpu, TextureKind::D2)
            }
        },
    }
}

/// A shared [`Model`] placed in the world.
pub struct ModelEntity {
    entity: Entity,
    model: Rc<Model>,
}

impl ModelEntity {
    pub fn new(model: Rc<Model>, entity: Entity) -> Self {
        Self { entity, model }
    }

    pub fn at(model: Rc<Model>, position: Vec3) -> Self {
        Self::new(model, Entity::at(position))
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

impl Renderable for ModelEntity {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn render(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, shader: &mut Shader) {
        shader.set_mat4("model", self.entity.model());
        self.model.draw(gpu, pass, shader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;

    const OBJ: &str = "\
mtllib scene.mtl
o first
v 0 0 0
v 1 0 0
v 0 1 0
vt 0.25 0.75
vt 1 0
vt 0 1
vn 0 0 1
usemtl brick
f 1/1/1 2/2/1 3/3/1
o second
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
usemtl brick
f 4/1/1 5/2/1 6/3/1 7/3/1
";

    const MTL: &str = "\
newmtl brick
Kd 1 1 1
map_Kd textures\\brick.png
map_Ks brick_spec.png
";

    fn parse() -> ModelData {
        parse_obj(&mut Cursor::new(OBJ), Path::new("models/wall"), |_| {
            tobj::load_mtl_buf(&mut Cursor::new(MTL))
        })
        .unwrap()
    }

    #[test]
    fn obj_objects_become_meshes() {
        let data = parse();
        assert_eq!(data.meshes.len(), 2);
        assert_eq!(data.meshes[0].name, "first");
        assert_eq!(data.meshes[0].mesh.vertices.len(), 3);
        // the quad is triangulated
        assert_eq!(data.meshes[1].mesh.indices.len(), 6);
    }

    #[test]
    fn obj_uvs_are_flipped() {
        let data = parse();
        let v = data.meshes[0].mesh.vertices[0];
        assert_eq!(v.uv, [0.25, 0.25]);
        assert_eq!(v.normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn material_textures_resolve_against_model_directory() {
        let data = parse();
        let textures = &data.meshes[0].textures;
        assert_eq!(
            textures,
            &vec![
                MaterialTexture {
                    kind: MaterialTextureKind::Diffuse,
                    source: TextureSource::File(PathBuf::from("models/wall/textures/brick.png")),
                },
                MaterialTexture {
                    kind: MaterialTextureKind::Specular,
                    source: TextureSource::File(PathBuf::from("models/wall/brick_spec.png")),
                },
            ]
        );
    }

    #[test]
    fn shared_texture_paths_load_once() {
        let data = parse();
        let mut cache: TextureCache<u32> = TextureCache::new();
        let loads = Cell::new(0);
        let mut ids = Vec::new();
        for mesh in &data.meshes {
            for texture in &mesh.textures {
                ids.push(cache.get_or_load(&texture.source.cache_key(), || {
                    loads.set(loads.get() + 1);
                    100 + loads.get()
                }));
            }
        }
        // two meshes × (diffuse + specular), two distinct paths
        assert_eq!(ids, vec![101, 102, 101, 102]);
        assert_eq!(loads.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn same_path_returns_same_shared_value() {
        let mut cache: TextureCache<Rc<String>> = TextureCache::new();
        let a = cache.get_or_load("wood.png", || Rc::new("wood".to_owned()));
        let b = cache.get_or_load("wood.png", || Rc::new("other".to_owned()));
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn uniform_names_count_per_kind() {
        use MaterialTextureKind::*;
        assert_eq!(
            material_uniform_names([Diffuse, Specular, Diffuse, Diffuse, Specular]),
            vec![
                "material.texture_diffuse1",
                "material.texture_specular1",
                "material.texture_diffuse2",
                "material.texture_diffuse3",
                "material.texture_specular2",
            ]
        );
    }

    #[test]
    fn missing_normals_are_generated() {
        let obj = "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let data = parse_obj(&mut Cursor::new(obj), Path::new(""), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })
        .unwrap();
        let mesh = &data.meshes[0];
        assert!(mesh.textures.is_empty());
        assert!(mesh.mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let err = load_model_data(Path::new("models/thing.fbx")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(_)));
        let err = load_model_data(Path::new("models/missing.obj")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
