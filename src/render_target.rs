//! Off-screen targets and the full-screen passes that read them back.

use crate::assets::ResourceDirs;
use crate::gpu::GpuContext;
use crate::shader::{PipelineOptions, Shader};
use crate::texture::{Texture, TextureKind};
use crate::uniform::ShaderLayout;

/// Begin a pass drawing into `color` (and `depth`, when given).
///
/// `clear` selects between clearing the colour attachment and loading
/// what is already there. Depth is always cleared to 1.
pub fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    color: &wgpu::TextureView,
    depth: Option<&wgpu::TextureView>,
    clear: Option<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Colour + depth target that can be rendered into and then sampled.
pub struct RenderTarget {
    pub color: Texture,
    pub depth: Texture,
    format: wgpu::TextureFormat,
    label: String,
}

impl RenderTarget {
    pub fn new(
        gpu: &GpuContext,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        Self {
            color: Texture::render_target(gpu, width, height, format, label),
            depth: Texture::depth(gpu, width, height, &format!("{label} Depth")),
            format,
            label: label.to_owned(),
        }
    }

    pub fn width(&self) -> u32 {
        self.color.width
    }

    pub fn height(&self) -> u32 {
        self.color.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        begin_pass(
            encoder,
            &self.label,
            self.color.view(),
            Some(self.depth.view()),
            Some(clear),
        )
    }
}

/// Post-processing effect applied by [`ScreenQuad`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum ScreenEffect {
    #[default]
    None = 0,
    Inversion = 1,
    Grayscale = 2,
    Sharpen = 3,
    Blur = 4,
    EdgeDetect = 5,
}

/// Full-screen triangle sampling a colour texture through `screen.frag`.
pub struct ScreenQuad {
    shader: Shader,
    pub effect: ScreenEffect,
}

impl ScreenQuad {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs, format: wgpu::TextureFormat) -> Self {
        let layout = ShaderLayout::new()
            .int("effect")
            .texture("screenTexture", TextureKind::D2);
        Self {
            shader: Shader::load(
                gpu,
                dirs,
                "screen.vert",
                "screen.frag",
                layout,
                PipelineOptions::screen(format),
            ),
            effect: ScreenEffect::default(),
        }
    }

    pub fn draw(&mut self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, source: &Texture) {
        self.shader.set_int("effect", self.effect as i32);
        self.shader.set_texture("screenTexture", source);
        if self.shader.bind(gpu, pass) {
            pass.draw(0..3, 0..1);
        }
    }
}

/// Small quad in the bottom-right corner showing a depth texture in
/// greyscale. Handy for checking shadow maps.
pub struct DepthDebugQuad {
    shader: Shader,
}

impl DepthDebugQuad {
    pub fn new(gpu: &GpuContext, dirs: &ResourceDirs, format: wgpu::TextureFormat) -> Self {
        let layout = ShaderLayout::new()
            .vec4("rect")
            .texture("depthMap", TextureKind::Depth);
        let mut shader = Shader::load(
            gpu,
            dirs,
            "debug_quad.vert",
            "debug_quad.frag",
            layout,
            PipelineOptions::screen(format).topology(wgpu::PrimitiveTopology::TriangleStrip),
        );
        // x0, y0, x1, y1 in NDC
        shader.set_vec4("rect", glam::Vec4::new(0.5, -1.0, 1.0, -0.5));
        Self { shader }
    }

    pub fn draw(&mut self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, depth: &Texture) {
        self.shader.set_texture("depthMap", depth);
        if self.shader.bind(gpu, pass) {
            pass.draw(0..4, 0..1);
        }
    }
}

/// Depth texture matching the window surface, recreated on resize.
pub struct SurfaceDepth {
    texture: Texture,
}

impl SurfaceDepth {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            texture: Texture::depth(gpu, gpu.width(), gpu.height(), "Surface Depth"),
        }
    }

    pub fn ensure_size(&mut self, gpu: &GpuContext) {
        if self.texture.width != gpu.width().max(1) || self.texture.height != gpu.height().max(1) {
            *self = Self::new(gpu);
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        self.texture.view()
    }
}
