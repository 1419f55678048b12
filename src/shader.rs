//! Shader programs: a WGSL vertex/fragment pair, its pipeline and its inputs.
//!
//! Uniforms are staged on the CPU in a [`UniformBlock`] and snapshotted into a
//! dynamic-offset ring buffer every time [`Shader::bind`] is called, so each
//! draw sees the values that were current when it was recorded. Textures are
//! bound by slot name into bind group 1.
//!
//! ```no_run
//! # use caruti::*;
//! # fn demo(gpu: &GpuContext, dirs: &ResourceDirs, texture: &Texture,
//! #         pass: &mut wgpu::RenderPass<'_>, mesh: &Mesh, camera: &Camera) {
//! let layout = ShaderLayout::new()
//!     .mat4("model")
//!     .mat4("camera")
//!     .texture("material.texture_diffuse1", TextureKind::D2);
//! let mut shader = Shader::load(
//!     gpu,
//!     dirs,
//!     "textured.vert",
//!     "textured.frag",
//!     layout,
//!     PipelineOptions::lit(gpu.format()),
//! );
//!
//! shader.set_mat4("camera", camera.camera_matrix());
//! shader.set_texture("material.texture_diffuse1", texture);
//! shader.set_mat4("model", Mat4::IDENTITY);
//! if shader.bind(gpu, pass) {
//!     mesh.draw(pass);
//! }
//! # }
//! ```

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::assets::{ResourceDirs, read_text};
use crate::error::{Error, Result};
use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::instance::InstanceRaw;
use crate::mesh::{POSITION_LAYOUT, Vertex3d};
use crate::texture::{Texture, TextureId, TextureKind};
use crate::uniform::{RingCursor, ShaderLayout, UniformBlock, UniformSlot, UniformValue};

/// Default number of draws one shader can record per frame.
pub const MAX_DRAWS_PER_FRAME: u32 = 1024;

/// Bind group caches are dropped once they grow past this many entries.
const MAX_CACHED_BIND_GROUPS: usize = 256;

const MESH_BUFFERS: &[wgpu::VertexBufferLayout<'static>] = &[Vertex3d::LAYOUT];
const INSTANCED_BUFFERS: &[wgpu::VertexBufferLayout<'static>] =
    &[Vertex3d::LAYOUT, InstanceRaw::LAYOUT];
const POSITION_BUFFERS: &[wgpu::VertexBufferLayout<'static>] = &[POSITION_LAYOUT];

/// Which vertex buffers the vertex stage reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexInput {
    /// [`Vertex3d`] in slot 0.
    Mesh,
    /// [`Vertex3d`] in slot 0 and [`InstanceRaw`] in slot 1.
    MeshInstanced,
    /// Bare positions in slot 0.
    Positions,
    /// Nothing; vertices come from `vertex_index`.
    None,
}

impl VertexInput {
    fn buffers(self) -> &'static [wgpu::VertexBufferLayout<'static>] {
        match self {
            Self::Mesh => MESH_BUFFERS,
            Self::MeshInstanced => INSTANCED_BUFFERS,
            Self::Positions => POSITION_BUFFERS,
            Self::None => &[],
        }
    }
}

/// Depth test settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthOptions {
    pub compare: wgpu::CompareFunction,
    pub write: bool,
}

impl DepthOptions {
    pub const LESS: Self = Self {
        compare: wgpu::CompareFunction::Less,
        write: true,
    };
    /// Test against the buffer without writing (skyboxes).
    pub const LESS_EQUAL_READ_ONLY: Self = Self {
        compare: wgpu::CompareFunction::LessEqual,
        write: false,
    };
    /// Depth attachment present but ignored (screen-space passes).
    pub const IGNORE: Self = Self {
        compare: wgpu::CompareFunction::Always,
        write: false,
    };
}

/// Fixed-function state baked into a shader's pipeline.
#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    pub vertex_input: VertexInput,
    /// `None` builds a depth-only pipeline.
    pub color_format: Option<wgpu::TextureFormat>,
    /// `None` for passes without a depth attachment.
    pub depth: Option<DepthOptions>,
    pub cull_mode: Option<wgpu::Face>,
    pub blend: Option<wgpu::BlendState>,
    pub topology: wgpu::PrimitiveTopology,
    pub max_draws_per_frame: u32,
}

impl PipelineOptions {
    /// Opaque lit geometry: mesh vertices, depth test, no culling.
    pub fn lit(color_format: wgpu::TextureFormat) -> Self {
        Self {
            vertex_input: VertexInput::Mesh,
            color_format: Some(color_format),
            depth: Some(DepthOptions::LESS),
            cull_mode: None,
            blend: None,
            topology: wgpu::PrimitiveTopology::TriangleList,
            max_draws_per_frame: MAX_DRAWS_PER_FRAME,
        }
    }

    /// Shadow-map pass: no colour target, front faces culled.
    pub fn depth_only() -> Self {
        Self {
            color_format: None,
            cull_mode: Some(wgpu::Face::Front),
            ..Self::lit(wgpu::TextureFormat::Rgba8Unorm)
        }
    }

    /// Full-screen pass drawn from `vertex_index` into a pass that has a depth attachment.
    pub fn screen(color_format: wgpu::TextureFormat) -> Self {
        Self {
            vertex_input: VertexInput::None,
            depth: Some(DepthOptions::IGNORE),
            ..Self::lit(color_format)
        }
    }

    pub fn instanced(mut self) -> Self {
        self.vertex_input = VertexInput::MeshInstanced;
        self
    }

    pub fn vertex_input(mut self, input: VertexInput) -> Self {
        self.vertex_input = input;
        self
    }

    pub fn depth(mut self, depth: Option<DepthOptions>) -> Self {
        self.depth = depth;
        self
    }

    pub fn cull(mut self, face: Option<wgpu::Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn blend(mut self, blend: wgpu::BlendState) -> Self {
        self.blend = Some(blend);
        self
    }

    pub fn topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn max_draws(mut self, draws: u32) -> Self {
        self.max_draws_per_frame = draws;
        self
    }
}

struct BoundTexture {
    id: TextureId,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl BoundTexture {
    fn of(texture: &Texture) -> Self {
        Self {
            id: texture.id(),
            view: texture.view().clone(),
            sampler: texture.sampler().clone(),
        }
    }
}

/// A compiled vertex + fragment program with its uniform and texture state.
///
/// A shader that failed to load stays usable as a value: setters still
/// work, and [`Shader::bind`] returns `false` so callers skip the draw.
pub struct Shader {
    label: String,
    pipeline: Option<wgpu::RenderPipeline>,
    uniforms: UniformBlock,
    ring: RingCursor,
    frame: Option<u64>,
    overflow_logged: bool,
    uniform_buffer: wgpu::Buffer,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: Option<wgpu::BindGroupLayout>,
    textures: Vec<BoundTexture>,
    bind_groups: HashMap<Vec<TextureId>, wgpu::BindGroup>,
}

impl Shader {
    /// Load `resources/shaders/<vertex>` and `<fragment>` and build the pipeline.
    ///
    /// Failures are logged; the returned shader then skips every draw.
    pub fn load(
        gpu: &GpuContext,
        dirs: &ResourceDirs,
        vertex: &str,
        fragment: &str,
        layout: ShaderLayout,
        options: PipelineOptions,
    ) -> Self {
        match Self::try_load(gpu, dirs, vertex, fragment, layout.clone(), options) {
            Ok(shader) => shader,
            Err(err) => {
                log::error!("{err}");
                Self::without_pipeline(gpu, &format!("{vertex}+{fragment}"), layout, &options)
            }
        }
    }

    pub fn try_load(
        gpu: &GpuContext,
        dirs: &ResourceDirs,
        vertex: &str,
        fragment: &str,
        layout: ShaderLayout,
        options: PipelineOptions,
    ) -> Result<Self> {
        let vertex_source = read_text(&dirs.shader(vertex))?;
        let fragment_source = read_text(&dirs.shader(fragment))?;
        let shader = Self::from_sources(
            gpu,
            &format!("{vertex}+{fragment}"),
            &vertex_source,
            &fragment_source,
            layout,
            options,
        )?;
        log::info!("compiled shader {vertex} + {fragment}");
        Ok(shader)
    }

    /// Build from in-memory WGSL. The vertex source must define `vs_main`,
    /// the fragment source `fs_main`.
    pub fn from_sources(
        gpu: &GpuContext,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
        layout: ShaderLayout,
        options: PipelineOptions,
    ) -> Result<Self> {
        let mut shader = Self::without_pipeline(gpu, label, layout, &options);
        shader.pipeline = Some(shader.compile(gpu, vertex_source, fragment_source, &options)?);
        Ok(shader)
    }

    fn without_pipeline(
        gpu: &GpuContext,
        label: &str,
        layout: ShaderLayout,
        options: &PipelineOptions,
    ) -> Self {
        let ring = RingCursor::new(
            layout.block_size(),
            gpu.uniform_offset_alignment(),
            options.max_draws_per_frame,
        );

        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniforms")),
            size: ring.buffer_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} Uniform Layout")),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(u64::from(layout.block_size())),
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Uniform Bind Group")),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(u64::from(layout.block_size())),
                }),
            }],
        });

        let texture_layout = (!layout.textures().is_empty()).then(|| {
            let entries: Vec<wgpu::BindGroupLayoutEntry> = layout
                .textures()
                .iter()
                .enumerate()
                .flat_map(|(i, slot)| texture_layout_entries(i as u32, slot.kind))
                .collect();
            gpu.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{label} Texture Layout")),
                    entries: &entries,
                })
        });

        // Unset slots sample a 1×1 placeholder of the right kind.
        let textures = layout
            .textures()
            .iter()
            .map(|slot| BoundTexture::of(&Texture::placeholder(gpu, slot.kind)))
            .collect();

        Self {
            label: label.to_owned(),
            pipeline: None,
            uniforms: UniformBlock::new(layout),
            ring,
            frame: None,
            overflow_logged: false,
            uniform_buffer,
            uniform_layout,
            uniform_bind_group,
            texture_layout,
            textures,
            bind_groups: HashMap::new(),
        }
    }

    fn compile(
        &self,
        gpu: &GpuContext,
        vertex_source: &str,
        fragment_source: &str,
        options: &PipelineOptions,
    ) -> Result<wgpu::RenderPipeline> {
        let device = &gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Vertex", self.label)),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Fragment", self.label)),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });

        let mut bind_group_layouts = vec![&self.uniform_layout];
        bind_group_layouts.extend(self.texture_layout.as_ref());
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", self.label)),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let targets: Vec<Option<wgpu::ColorTargetState>> = options
            .color_format
            .map(|format| wgpu::ColorTargetState {
                format,
                blend: options.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })
            .into_iter()
            .map(Some)
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&self.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs_main"),
                buffers: options.vertex_input.buffers(),
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: options.topology,
                cull_mode: options.cull_mode,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: options.depth.map(|depth| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: depth.write,
                depth_compare: depth.compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(Error::Shader {
                label: self.label.clone(),
                message: err.to_string(),
            }),
            None => Ok(pipeline),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// False when compilation failed; such a shader never draws.
    pub fn is_valid(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn layout(&self) -> &ShaderLayout {
        self.uniforms.layout()
    }

    /// Resolve a uniform name once for repeated writes through [`Shader::set`].
    pub fn uniform<T: UniformValue>(&self, name: &str) -> Option<UniformSlot<T>> {
        self.uniforms.layout().slot(name)
    }

    pub fn set<T: UniformValue>(&mut self, slot: UniformSlot<T>, value: T) {
        self.uniforms.set(slot, value);
    }

    /// Write a uniform by name. Unknown names are ignored.
    pub fn set_named<T: UniformValue>(&mut self, name: &str, value: T) {
        self.uniforms.set_named(name, value);
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set_named(name, value);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set_named(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_named(name, value);
    }

    pub fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.set_named(name, value);
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.set_named(name, value);
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.set_named(name, value);
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set_named(name, value);
    }

    /// Bind `texture` to the named slot for subsequent draws.
    pub fn set_texture(&mut self, name: &str, texture: &Texture) {
        let layout = self.uniforms.layout();
        let Some(index) = layout.texture_index(name) else {
            log::trace!("shader {} has no texture slot `{name}`", self.label);
            return;
        };
        let expected = layout.textures()[index].kind;
        if texture.kind() != expected {
            log::warn!(
                "shader {}: slot `{name}` expects a {expected:?} texture, got {:?}",
                self.label,
                texture.kind()
            );
            return;
        }
        self.textures[index] = BoundTexture::of(texture);
    }

    /// Rewind the uniform ring. [`Shader::bind`] already does this the first
    /// time it is called in a new [`GpuContext::frame`]; calling it after
    /// draws were recorded this frame overwrites their uniforms.
    pub fn begin_frame(&mut self) {
        self.ring.reset();
        self.overflow_logged = false;
    }

    /// Make this program current for the next draw recorded into `pass`.
    ///
    /// Snapshots the staged uniforms and bound textures. Returns `false`
    /// (and records nothing) when the shader is invalid or has used up its
    /// per-frame draw capacity.
    pub fn bind(&mut self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>) -> bool {
        if self.frame != Some(gpu.frame()) {
            self.frame = Some(gpu.frame());
            self.begin_frame();
        }

        let Some(pipeline) = &self.pipeline else {
            return false;
        };
        let Some(offset) = self.ring.allocate() else {
            if !self.overflow_logged {
                log::warn!(
                    "shader {} exceeded {} draws this frame, skipping the rest",
                    self.label,
                    self.ring.capacity()
                );
                self.overflow_logged = true;
            }
            return false;
        };

        gpu.queue
            .write_buffer(&self.uniform_buffer, u64::from(offset), self.uniforms.bytes());
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
        if let Some(textures) = self.texture_bind_group(gpu) {
            pass.set_bind_group(1, &textures, &[]);
        }
        true
    }

    fn texture_bind_group(&mut self, gpu: &GpuContext) -> Option<wgpu::BindGroup> {
        let layout = self.texture_layout.as_ref()?;
        let key: Vec<TextureId> = self.textures.iter().map(|t| t.id).collect();
        if let Some(group) = self.bind_groups.get(&key) {
            return Some(group.clone());
        }

        if self.bind_groups.len() >= MAX_CACHED_BIND_GROUPS {
            self.bind_groups.clear();
        }
        let entries: Vec<wgpu::BindGroupEntry> = self
            .textures
            .iter()
            .enumerate()
            .flat_map(|(i, texture)| {
                [
                    wgpu::BindGroupEntry {
                        binding: 2 * i as u32,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2 * i as u32 + 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ]
            })
            .collect();
        let group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Textures", self.label)),
            layout,
            entries: &entries,
        });
        self.bind_groups.insert(key, group.clone());
        Some(group)
    }
}

fn texture_layout_entries(index: u32, kind: TextureKind) -> [wgpu::BindGroupLayoutEntry; 2] {
    let (sample_type, view_dimension, sampler) = match kind {
        TextureKind::D2 => (
            wgpu::TextureSampleType::Float { filterable: true },
            wgpu::TextureViewDimension::D2,
            wgpu::SamplerBindingType::Filtering,
        ),
        TextureKind::Cube => (
            wgpu::TextureSampleType::Float { filterable: true },
            wgpu::TextureViewDimension::Cube,
            wgpu::SamplerBindingType::Filtering,
        ),
        TextureKind::Depth => (
            wgpu::TextureSampleType::Depth,
            wgpu::TextureViewDimension::D2,
            wgpu::SamplerBindingType::Comparison,
        ),
    };
    [
        wgpu::BindGroupLayoutEntry {
            binding: 2 * index,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2 * index + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(sampler),
            count: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_slots_pair_view_and_sampler() {
        let [view, sampler] = texture_layout_entries(2, TextureKind::Depth);
        assert_eq!(view.binding, 4);
        assert_eq!(sampler.binding, 5);
        assert!(matches!(
            view.ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                ..
            }
        ));
        assert!(matches!(
            sampler.ty,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
        ));
    }

    #[test]
    fn cube_slots_use_cube_views() {
        let [view, _] = texture_layout_entries(0, TextureKind::Cube);
        assert!(matches!(
            view.ty,
            wgpu::BindingType::Texture {
                view_dimension: wgpu::TextureViewDimension::Cube,
                ..
            }
        ));
    }

    #[test]
    fn option_presets() {
        let depth = PipelineOptions::depth_only();
        assert_eq!(depth.color_format, None);
        assert_eq!(depth.cull_mode, Some(wgpu::Face::Front));
        assert_eq!(depth.depth, Some(DepthOptions::LESS));

        let instanced = PipelineOptions::lit(wgpu::TextureFormat::Bgra8UnormSrgb).instanced();
        assert_eq!(instanced.vertex_input.buffers().len(), 2);
        assert_eq!(
            instanced.vertex_input.buffers()[1].step_mode,
            wgpu::VertexStepMode::Instance
        );

        let screen = PipelineOptions::screen(wgpu::TextureFormat::Bgra8UnormSrgb);
        assert!(screen.vertex_input.buffers().is_empty());
        assert_eq!(screen.depth, Some(DepthOptions::IGNORE));

        let tuned = PipelineOptions::lit(wgpu::TextureFormat::Rgba8Unorm)
            .cull(Some(wgpu::Face::Back))
            .max_draws(4);
        assert_eq!(tuned.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(tuned.max_draws_per_frame, 4);
    }
}
