//! CPU side of a shader's interface: uniform layout, staging and texture slots.
//!
//! A [`ShaderLayout`] lists the fields of the shader's uniform struct in
//! declaration order, and the named textures it samples. Offsets follow the
//! WGSL uniform address-space rules, so a layout built as
//!
//! ```
//! use caruti::ShaderLayout;
//!
//! let layout = ShaderLayout::new()
//!     .mat4("model")
//!     .vec3("cameraPos")
//!     .float("material.shininess");
//! assert_eq!(layout.offset_of("material.shininess"), Some(76));
//! assert_eq!(layout.block_size(), 80);
//! ```
//!
//! matches `struct U { model: mat4x4<f32>, camera_pos: vec3<f32>, shininess: f32 }`.
//!
//! Names are resolved once into [`UniformSlot`] handles; writing to a name
//! the layout does not contain is a silent no-op.

use std::collections::HashMap;
use std::marker::PhantomData;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::texture::TextureKind;

/// Scalar, vector and matrix types a uniform field can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformType {
    /// Stored as a `u32` (WGSL has no host-shareable `bool`).
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    pub const fn size(self) -> u32 {
        match self {
            Self::Bool | Self::Int | Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Mat4 => 64,
        }
    }

    pub const fn align(self) -> u32 {
        match self {
            Self::Bool | Self::Int | Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 | Self::Mat4 => 16,
        }
    }
}

/// Host values that can be written into a uniform field.
pub trait UniformValue: Copy {
    const TYPE: UniformType;

    /// Write exactly `Self::TYPE.size()` bytes.
    fn write(&self, out: &mut [u8]);
}

macro_rules! pod_uniform {
    ($ty:ty, $kind:ident, |$v:ident| $bytes:expr) => {
        impl UniformValue for $ty {
            const TYPE: UniformType = UniformType::$kind;

            fn write(&self, out: &mut [u8]) {
                let $v = self;
                out.copy_from_slice(bytemuck::bytes_of(&$bytes));
            }
        }
    };
}

pod_uniform!(bool, Bool, |v| u32::from(*v));
pod_uniform!(i32, Int, |v| *v);
pod_uniform!(f32, Float, |v| *v);
pod_uniform!(Vec2, Vec2, |v| v.to_array());
pod_uniform!(Vec3, Vec3, |v| v.to_array());
pod_uniform!(Vec4, Vec4, |v| v.to_array());
pod_uniform!(Mat4, Mat4, |v| v.to_cols_array());

pub(crate) const fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

#[derive(Clone, Debug)]
struct UniformField {
    name: String,
    ty: UniformType,
    offset: u32,
}

/// A named texture the shader samples, bound at `2 * index` (view) and
/// `2 * index + 1` (sampler) in bind group 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: String,
    pub kind: TextureKind,
}

/// Uniform struct layout plus texture slots for one shader program.
#[derive(Clone, Debug, Default)]
pub struct ShaderLayout {
    fields: Vec<UniformField>,
    by_name: HashMap<String, usize>,
    end: u32,
    textures: Vec<TextureSlot>,
}

impl ShaderLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, placed at the next offset its alignment allows.
    ///
    /// Redeclaring a name keeps the first declaration.
    pub fn field(mut self, name: &str, ty: UniformType) -> Self {
        let offset = align_to(self.end, ty.align());
        self.end = offset + ty.size();
        if !self.by_name.contains_key(name) {
            self.by_name.insert(name.to_owned(), self.fields.len());
        }
        self.fields.push(UniformField {
            name: name.to_owned(),
            ty,
            offset,
        });
        self
    }

    pub fn bool(self, name: &str) -> Self {
        self.field(name, UniformType::Bool)
    }

    pub fn int(self, name: &str) -> Self {
        self.field(name, UniformType::Int)
    }

    pub fn float(self, name: &str) -> Self {
        self.field(name, UniformType::Float)
    }

    pub fn vec2(self, name: &str) -> Self {
        self.field(name, UniformType::Vec2)
    }

    pub fn vec3(self, name: &str) -> Self {
        self.field(name, UniformType::Vec3)
    }

    pub fn vec4(self, name: &str) -> Self {
        self.field(name, UniformType::Vec4)
    }

    pub fn mat4(self, name: &str) -> Self {
        self.field(name, UniformType::Mat4)
    }

    /// Declare a sampled texture.
    pub fn texture(mut self, name: &str, kind: TextureKind) -> Self {
        self.textures.push(TextureSlot {
            name: name.to_owned(),
            kind,
        });
        self
    }

    /// Size of the uniform block, rounded up to 16 bytes (never zero).
    pub fn block_size(&self) -> u32 {
        align_to(self.end.max(1), 16)
    }

    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|&i| self.fields[i].offset)
    }

    pub fn type_of(&self, name: &str) -> Option<UniformType> {
        self.by_name.get(name).map(|&i| self.fields[i].ty)
    }

    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    pub fn texture_index(&self, name: &str) -> Option<usize> {
        self.textures.iter().position(|slot| slot.name == name)
    }

    /// Resolve `name` to a typed handle. `None` if the name is unknown or
    /// declared with a different type.
    pub fn slot<T: UniformValue>(&self, name: &str) -> Option<UniformSlot<T>> {
        let field = &self.fields[*self.by_name.get(name)?];
        (field.ty == T::TYPE).then(|| UniformSlot {
            offset: field.offset,
            _marker: PhantomData,
        })
    }
}

/// A resolved uniform field of type `T`.
pub struct UniformSlot<T> {
    offset: u32,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for UniformSlot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UniformSlot<T> {}

impl<T> std::fmt::Debug for UniformSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformSlot")
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T> UniformSlot<T> {
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

/// CPU staging copy of a uniform block.
///
/// Values persist until overwritten, like uniforms on a linked program.
#[derive(Clone, Debug)]
pub struct UniformBlock {
    layout: ShaderLayout,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: ShaderLayout) -> Self {
        let bytes = vec![0; layout.block_size() as usize];
        Self { layout, bytes }
    }

    pub fn layout(&self) -> &ShaderLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write through a resolved slot. A slot from a layout larger than this
    /// block's points past the end and is ignored.
    pub fn set<T: UniformValue>(&mut self, slot: UniformSlot<T>, value: T) {
        let start = slot.offset as usize;
        let end = start + T::TYPE.size() as usize;
        match self.bytes.get_mut(start..end) {
            Some(dst) => value.write(dst),
            None => log::trace!(
                "ignoring {:?} write at offset {start}, block is {} bytes",
                T::TYPE,
                self.bytes.len()
            ),
        }
    }

    /// Write by name. Unknown names and type mismatches are ignored.
    pub fn set_named<T: UniformValue>(&mut self, name: &str, value: T) -> bool {
        match self.layout.slot::<T>(name) {
            Some(slot) => {
                self.set(slot, value);
                true
            }
            None => {
                log::trace!("ignoring write to uniform `{name}` ({:?})", T::TYPE);
                false
            }
        }
    }
}

/// Hands out aligned offsets into a fixed-capacity dynamic uniform buffer.
///
/// Each draw gets its own snapshot of the uniform block; the cursor resets at
/// the start of every frame.
#[derive(Clone, Copy, Debug)]
pub struct RingCursor {
    stride: u32,
    capacity: u32,
    next: u32,
}

impl RingCursor {
    pub fn new(block_size: u32, alignment: u32, capacity: u32) -> Self {
        Self {
            stride: align_to(block_size, alignment.max(1)),
            capacity: capacity.max(1),
            next: 0,
        }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn buffer_size(&self) -> u64 {
        u64::from(self.stride) * u64::from(self.capacity)
    }

    /// Next free offset, or `None` once the frame's capacity is used up.
    pub fn allocate(&mut self) -> Option<u32> {
        (self.next < self.capacity).then(|| {
            let offset = self.next * self.stride;
            self.next += 1;
            offset
        })
    }

    pub fn used(&self) -> u32 {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read<T: bytemuck::Pod>(bytes: &[u8], offset: usize) -> T {
        bytemuck::pod_read_unaligned(&bytes[offset..offset + std::mem::size_of::<T>()])
    }

    fn lit_layout() -> ShaderLayout {
        ShaderLayout::new()
            .mat4("model")
            .mat4("camera")
            .vec3("cameraPos")
            .float("material.shininess")
            .vec3("dirLight.direction")
            .bool("shadowsEnabled")
            .vec3("dirLight.ambient")
            .vec2("uvScale")
            .int("effect")
    }

    #[test]
    fn offsets_follow_wgsl_alignment() {
        let layout = lit_layout();
        assert_eq!(layout.offset_of("model"), Some(0));
        assert_eq!(layout.offset_of("camera"), Some(64));
        assert_eq!(layout.offset_of("cameraPos"), Some(128));
        // f32 packs into the vec3's trailing padding
        assert_eq!(layout.offset_of("material.shininess"), Some(140));
        assert_eq!(layout.offset_of("dirLight.direction"), Some(144));
        assert_eq!(layout.offset_of("shadowsEnabled"), Some(156));
        assert_eq!(layout.offset_of("dirLight.ambient"), Some(160));
        // vec2 needs 8-byte alignment: 172 -> 176
        assert_eq!(layout.offset_of("uvScale"), Some(176));
        assert_eq!(layout.offset_of("effect"), Some(184));
        assert_eq!(layout.block_size(), 192);
    }

    #[test]
    fn empty_layout_still_has_a_block() {
        assert_eq!(ShaderLayout::new().block_size(), 16);
    }

    #[test]
    fn slots_are_typed() {
        let layout = lit_layout();
        assert!(layout.slot::<Mat4>("model").is_some());
        assert!(layout.slot::<Vec3>("model").is_none());
        assert!(layout.slot::<f32>("nope").is_none());
        assert_eq!(layout.slot::<bool>("shadowsEnabled").map(|s| s.offset()), Some(156));
        assert_eq!(layout.type_of("uvScale"), Some(UniformType::Vec2));
        assert_eq!(layout.type_of("missing"), None);
    }

    #[test]
    fn writes_land_at_their_offsets() {
        let mut block = UniformBlock::new(lit_layout());
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(block.set_named("model", model));
        assert!(block.set_named("material.shininess", 32.0f32));
        assert!(block.set_named("shadowsEnabled", true));
        assert!(block.set_named("effect", -2i32));

        let bytes = block.bytes();
        assert_eq!(read::<[f32; 16]>(bytes, 0), model.to_cols_array());
        assert_eq!(read::<f32>(bytes, 140), 32.0);
        assert_eq!(read::<u32>(bytes, 156), 1);
        assert_eq!(read::<i32>(bytes, 184), -2);
    }

    #[test]
    fn unknown_or_mistyped_writes_are_ignored() {
        let mut block = UniformBlock::new(lit_layout());
        let before = block.bytes().to_vec();
        assert!(!block.set_named("lightColor", Vec3::ONE));
        assert!(!block.set_named("cameraPos", 1.0f32));
        assert_eq!(block.bytes(), &before[..]);
    }

    #[test]
    fn values_persist_between_writes() {
        let mut block = UniformBlock::new(lit_layout());
        let pos = block.layout().slot::<Vec3>("cameraPos").unwrap();
        block.set(pos, Vec3::new(4.0, 5.0, 6.0));
        block.set_named("material.shininess", 8.0f32);
        assert_eq!(read::<[f32; 4]>(block.bytes(), 128), [4.0, 5.0, 6.0, 8.0]);
    }

    #[test]
    fn slot_from_a_larger_layout_is_ignored() {
        let small = ShaderLayout::new().mat4("model").vec3("lightColor");
        let mut block = UniformBlock::new(small);
        let before = block.bytes().to_vec();

        let far = lit_layout().slot::<Vec3>("dirLight.ambient").unwrap();
        assert!(far.offset() as usize >= block.bytes().len());
        block.set(far, Vec3::ONE);
        assert_eq!(block.bytes(), &before[..]);
    }

    #[test]
    fn texture_slots_keep_declaration_order() {
        let layout = ShaderLayout::new()
            .texture("material.texture_diffuse1", TextureKind::D2)
            .texture("shadowMap", TextureKind::Depth);
        assert_eq!(layout.texture_index("shadowMap"), Some(1));
        assert_eq!(layout.textures()[0].kind, TextureKind::D2);
        assert_eq!(layout.texture_index("skybox"), None);
    }

    #[test]
    fn ring_cursor_respects_alignment_and_capacity() {
        let mut ring = RingCursor::new(336, 256, 3);
        assert_eq!(ring.stride(), 512);
        assert_eq!(ring.buffer_size(), 1536);
        assert_eq!(ring.allocate(), Some(0));
        assert_eq!(ring.allocate(), Some(512));
        assert_eq!(ring.allocate(), Some(1024));
        assert_eq!(ring.allocate(), None);
        assert_eq!(ring.used(), 3);
        ring.reset();
        assert_eq!(ring.allocate(), Some(0));
    }
}
