//! GPU textures: decoded images, cubemaps, depth maps and render targets.
//!
//! Decoding and mip generation happen on the CPU through the `image` crate
//! ([`prepare_pixels`], [`assemble_cube_faces`]) and are uploaded in one
//! `create_texture_with_data` call. A file that fails to load is logged and
//! replaced by a 1×1 black texture so the frame still renders.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Pixel, RgbaImage};

use crate::error::{Error, Result};
use crate::gpu::{DEPTH_FORMAT, GpuContext};

/// Process-unique identity of a GPU texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a texture is sampled by shaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Filterable 2D colour texture.
    D2,
    /// Six-layer cube texture.
    Cube,
    /// Depth texture read through a comparison sampler.
    Depth,
}

/// Upload format chosen from the decoded channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgba8,
}

impl PixelFormat {
    /// 1 → red, 2 → red/green, 3 and 4 → RGBA (RGB gains opaque alpha).
    pub fn from_channels(channels: u8) -> Self {
        match channels {
            1 => Self::R8,
            2 => Self::Rg8,
            _ => Self::Rgba8,
        }
    }

    pub fn wgpu_format(self, srgb: bool) -> wgpu::TextureFormat {
        match self {
            Self::R8 => wgpu::TextureFormat::R8Unorm,
            Self::Rg8 => wgpu::TextureFormat::Rg8Unorm,
            Self::Rgba8 if srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Decoded pixels ready for upload, base level first.
#[derive(Clone, Debug)]
pub struct PixelData {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Channel count of the source image.
    pub channels: u8,
    pub levels: Vec<Vec<u8>>,
}

impl PixelData {
    /// All levels back to back, the layout `TextureDataOrder::LayerMajor` expects.
    pub fn concatenated(&self) -> Vec<u8> {
        self.levels.concat()
    }
}

/// Full mip chain length down to 1×1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

fn mip_chain<P>(base: ImageBuffer<P, Vec<u8>>, mipmaps: bool) -> Vec<Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (width, height) = base.dimensions();
    let count = if mipmaps {
        mip_level_count(width, height)
    } else {
        1
    };
    let smaller: Vec<Vec<u8>> = (1..count)
        .map(|level| {
            let w = (width >> level).max(1);
            let h = (height >> level).max(1);
            imageops::resize(&base, w, h, FilterType::Triangle).into_raw()
        })
        .collect();
    std::iter::once(base.into_raw()).chain(smaller).collect()
}

/// Convert a decoded image to an upload format, optionally flipped so the
/// first row in memory is the bottom of the picture, with an optional mip chain.
pub fn prepare_pixels(image: DynamicImage, flip_vertically: bool, mipmaps: bool) -> PixelData {
    let image = if flip_vertically { image.flipv() } else { image };
    let channels = image.color().channel_count();
    let (width, height) = (image.width(), image.height());
    let format = PixelFormat::from_channels(channels);
    let levels = match format {
        PixelFormat::R8 => mip_chain(image.into_luma8(), mipmaps),
        PixelFormat::Rg8 => mip_chain(image.into_luma_alpha8(), mipmaps),
        PixelFormat::Rgba8 => mip_chain(image.into_rgba8(), mipmaps),
    };
    PixelData {
        format,
        width,
        height,
        channels,
        levels,
    }
}

/// Pack six faces into one RGBA8 array-layer blob.
///
/// Missing faces become opaque black; faces whose size differs from the
/// first loaded face are resized to match. Returns the face edge length.
pub fn assemble_cube_faces(faces: Vec<Option<RgbaImage>>) -> (u32, u32, Vec<u8>) {
    let (width, height) = faces
        .iter()
        .flatten()
        .map(|face| face.dimensions())
        .next()
        .unwrap_or((1, 1));
    let mut data = Vec::with_capacity((width * height * 4) as usize * faces.len());
    for face in faces {
        match face {
            Some(face) if face.dimensions() == (width, height) => data.extend(face.into_raw()),
            Some(face) => {
                log::warn!(
                    "cubemap face is {:?}, resizing to {width}x{height}",
                    face.dimensions()
                );
                data.extend(imageops::resize(&face, width, height, FilterType::Triangle).into_raw());
            }
            None => data.extend([0, 0, 0, 255].repeat((width * height) as usize)),
        }
    }
    (width, height, data)
}

/// Sampling and decoding options for image textures.
#[derive(Clone, Copy, Debug)]
pub struct TextureOptions {
    pub address_mode: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub flip_vertically: bool,
    pub srgb: bool,
    pub mipmaps: bool,
}

impl Default for TextureOptions {
    /// Repeat, nearest magnification, mipmapped, flipped on load.
    fn default() -> Self {
        Self {
            address_mode: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            flip_vertically: true,
            srgb: true,
            mipmaps: true,
        }
    }
}

impl TextureOptions {
    /// Material textures of imported models: linear filtering, UVs already flipped.
    pub fn model() -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            flip_vertically: false,
            ..Self::default()
        }
    }

    pub fn clamp_to_edge(mut self) -> Self {
        self.address_mode = wgpu::AddressMode::ClampToEdge;
        self
    }

    pub fn linear(mut self) -> Self {
        self.mag_filter = wgpu::FilterMode::Linear;
        self.min_filter = wgpu::FilterMode::Linear;
        self
    }
}

#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    kind: TextureKind,
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Decode and upload an image file.
    pub fn try_from_file(gpu: &GpuContext, path: &Path, options: &TextureOptions) -> Result<Self> {
        let image = image::open(path).map_err(|e| Error::image(path, e))?;
        let pixels = prepare_pixels(image, options.flip_vertically, options.mipmaps);
        log::info!(
            "loaded texture {} ({}x{}, {} channels)",
            path.display(),
            pixels.width,
            pixels.height,
            pixels.channels
        );
        Ok(Self::from_pixels(gpu, &pixels, &path.display().to_string(), options))
    }

    /// Like [`Texture::try_from_file`], but logs failures and returns a black placeholder.
    pub fn from_file(gpu: &GpuContext, path: &Path, options: &TextureOptions) -> Self {
        Self::try_from_file(gpu, path, options).unwrap_or_else(|err| {
            log::error!("texture failed to load: {err}");
            Self::placeholder(gpu, TextureKind::D2)
        })
    }

    /// Upload an already decoded image.
    pub fn from_image(
        gpu: &GpuContext,
        image: DynamicImage,
        label: &str,
        options: &TextureOptions,
    ) -> Self {
        let pixels = prepare_pixels(image, options.flip_vertically, options.mipmaps);
        Self::from_pixels(gpu, &pixels, label, options)
    }

    pub fn from_pixels(
        gpu: &GpuContext,
        pixels: &PixelData,
        label: &str,
        options: &TextureOptions,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: pixels.width,
                    height: pixels.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: pixels.levels.len() as u32,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: pixels.format.wgpu_format(options.srgb),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &pixels.concatenated(),
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: options.address_mode,
            address_mode_v: options.address_mode,
            address_mode_w: options.address_mode,
            mag_filter: options.mag_filter,
            min_filter: options.min_filter,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            id: TextureId::next(),
            kind: TextureKind::D2,
            texture,
            view,
            sampler,
            width: pixels.width,
            height: pixels.height,
        }
    }

    /// Tightly packed RGBA8 data, single level.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        let pixels = PixelData {
            format: PixelFormat::Rgba8,
            width,
            height,
            channels: 4,
            levels: vec![data.to_vec()],
        };
        let options = TextureOptions {
            mipmaps: false,
            ..TextureOptions::default()
        };
        Self::from_pixels(gpu, &pixels, label, &options)
    }

    /// Build a cube texture from six files in +X, -X, +Y, -Y, +Z, -Z order.
    ///
    /// Faces are not flipped. Faces that fail to load are logged and left black.
    pub fn cubemap(gpu: &GpuContext, faces: &[impl AsRef<Path>; 6]) -> Self {
        let decoded = faces
            .iter()
            .map(|path| {
                let path = path.as_ref();
                match image::open(path) {
                    Ok(image) => Some(image.into_rgba8()),
                    Err(err) => {
                        log::error!("{}", Error::image(path, err));
                        None
                    }
                }
            })
            .collect();
        Self::cubemap_from_faces(gpu, decoded, "Cubemap")
    }

    /// Depth attachment that shaders can also sample with depth comparison.
    pub fn depth(gpu: &GpuContext, width: u32, height: u32, label: &str) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            id: TextureId::next(),
            kind: TextureKind::Depth,
            texture,
            view,
            sampler,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Colour attachment that can be sampled by a later pass.
    pub fn render_target(
        gpu: &GpuContext,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            id: TextureId::next(),
            kind: TextureKind::D2,
            texture,
            view,
            sampler,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// 1×1 stand-in of the given kind: black for colour and cube textures,
    /// an uninitialised (cleared) depth texture for depth.
    pub fn placeholder(gpu: &GpuContext, kind: TextureKind) -> Self {
        match kind {
            TextureKind::D2 => Self::from_rgba(gpu, &[0, 0, 0, 255], 1, 1, "Placeholder"),
            TextureKind::Cube => Self::cubemap_from_faces(gpu, vec![None; 6], "Placeholder Cubemap"),
            TextureKind::Depth => Self::depth(gpu, 1, 1, "Placeholder Depth"),
        }
    }

    fn cubemap_from_faces(gpu: &GpuContext, faces: Vec<Option<RgbaImage>>, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let (width, height, data) = assemble_cube_faces(faces);
        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label} View")),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            id: TextureId::next(),
            kind: TextureKind::Cube,
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba};

    #[test]
    fn channel_count_selects_format() {
        assert_eq!(PixelFormat::from_channels(1), PixelFormat::R8);
        assert_eq!(PixelFormat::from_channels(2), PixelFormat::Rg8);
        assert_eq!(PixelFormat::from_channels(3), PixelFormat::Rgba8);
        assert_eq!(PixelFormat::from_channels(4), PixelFormat::Rgba8);
        assert_eq!(
            PixelFormat::R8.wgpu_format(true),
            wgpu::TextureFormat::R8Unorm
        );
        assert_eq!(
            PixelFormat::Rgba8.wgpu_format(false),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn mip_count_reaches_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 128), 9);
        assert_eq!(mip_level_count(300, 7), 9);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn rgb_gains_opaque_alpha() {
        let image = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let pixels = prepare_pixels(DynamicImage::ImageRgb8(image), false, false);
        assert_eq!(pixels.format, PixelFormat::Rgba8);
        assert_eq!(pixels.channels, 3);
        assert_eq!(pixels.levels.len(), 1);
        assert_eq!(&pixels.levels[0][..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn grayscale_stays_single_channel_with_mips() {
        let image = GrayImage::from_pixel(8, 4, Luma([200]));
        let pixels = prepare_pixels(DynamicImage::ImageLuma8(image), false, true);
        assert_eq!(pixels.format, PixelFormat::R8);
        let sizes: Vec<usize> = pixels.levels.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![32, 8, 2, 1]);
        assert_eq!(pixels.concatenated().len(), 43);
    }

    #[test]
    fn flip_puts_bottom_row_first() {
        let mut image = RgbaImage::new(1, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        let pixels = prepare_pixels(DynamicImage::ImageRgba8(image), true, false);
        assert_eq!(&pixels.levels[0][..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn cube_faces_fill_gaps_and_resize() {
        let faces = vec![
            None,
            Some(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 4]))),
            Some(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 9]))),
            None,
            None,
            None,
        ];
        let (width, height, data) = assemble_cube_faces(faces);
        assert_eq!((width, height), (4, 4));
        assert_eq!(data.len(), 6 * 4 * 4 * 4);
        assert_eq!(&data[..4], &[0, 0, 0, 255]);
        assert_eq!(&data[64..68], &[1, 2, 3, 4]);
        assert_eq!(&data[128..132], &[9, 9, 9, 9]);
    }

    #[test]
    fn missing_cube_faces_default_to_one_pixel() {
        let (width, height, data) = assemble_cube_faces(vec![None; 6]);
        assert_eq!((width, height), (1, 1));
        assert_eq!(data, [0, 0, 0, 255].repeat(6));
    }

    #[test]
    fn texture_ids_are_unique() {
        let a = TextureId::next();
        let b = TextureId::next();
        assert_ne!(a, b);
    }
}
