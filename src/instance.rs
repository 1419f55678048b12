//! Per-instance model matrices for instanced draws.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;

/// One instance's model matrix, read by the vertex shader as four `vec4` columns.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl From<Mat4> for InstanceRaw {
    fn from(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4];

    /// Vertex slot 1, locations 3–6, advanced once per instance.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &Self::ATTRIBUTES,
    };
}

/// GPU buffer of [`InstanceRaw`], grown on demand.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: u32,
    len: u32,
}

impl InstanceBuffer {
    pub fn new(gpu: &GpuContext, matrices: &[Mat4]) -> Self {
        let raw: Vec<InstanceRaw> = matrices.iter().copied().map(InstanceRaw::from).collect();
        let buffer = Self::create(gpu, &raw, raw.len().max(1) as u32);
        Self {
            buffer,
            capacity: raw.len().max(1) as u32,
            len: raw.len() as u32,
        }
    }

    fn create(gpu: &GpuContext, raw: &[InstanceRaw], capacity: u32) -> wgpu::Buffer {
        let mut contents = bytemuck::cast_slice::<_, u8>(raw).to_vec();
        contents.resize(capacity as usize * std::mem::size_of::<InstanceRaw>(), 0);
        gpu.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: &contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Replace the contents; reallocates only when the new set is larger.
    pub fn update(&mut self, gpu: &GpuContext, matrices: &[Mat4]) {
        let raw: Vec<InstanceRaw> = matrices.iter().copied().map(InstanceRaw::from).collect();
        let len = raw.len() as u32;
        if len > self.capacity {
            self.capacity = len.next_power_of_two();
            self.buffer = Self::create(gpu, &raw, self.capacity);
        } else if !raw.is_empty() {
            gpu.queue
                .write_buffer(&self.buffer, 0, bytemuck::cast_slice(&raw));
        }
        self.len = len;
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn instance_is_four_columns() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 64);
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let raw = InstanceRaw::from(m);
        assert_eq!(raw.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(InstanceRaw::LAYOUT.attributes.len(), 4);
        assert_eq!(InstanceRaw::LAYOUT.attributes[0].shader_location, 3);
        assert_eq!(InstanceRaw::LAYOUT.attributes[3].offset, 48);
    }
}
