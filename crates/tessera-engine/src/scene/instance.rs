use bytemuck::{Pod, Zeroable};

use super::{IDENTITY, Mat4};

/// One placement of a 3D mesh.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Instance3D {
    pub transform: Mat4,
    /// Index into the material table. Out-of-range values are clamped at draw time.
    pub material: u32,
    pub _pad: [u32; 3],
}

impl Instance3D {
    pub fn new(transform: Mat4, material: u32) -> Self {
        Self {
            transform,
            material,
            _pad: [0; 3],
        }
    }

    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        3 => Float32x4, // transform col 0
        4 => Float32x4, // transform col 1
        5 => Float32x4, // transform col 2
        6 => Float32x4, // transform col 3
        7 => Uint32     // material
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Instance3D>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

impl Default for Instance3D {
    fn default() -> Self {
        Self::new(IDENTITY, 0)
    }
}

/// One placement of a 2D mesh.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Instance2D {
    pub transform: Mat4,
    /// Multiplies the vertex color.
    pub color: [f32; 4],
    /// Overlay ordering; smaller is nearer. Expected in `0.0..=1.0`.
    pub depth: f32,
    pub _pad: [f32; 3],
}

impl Instance2D {
    pub fn new(transform: Mat4) -> Self {
        Self {
            transform,
            color: [1.0; 4],
            depth: 0.0,
            _pad: [0.0; 3],
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    const ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        4 => Float32x4, // transform col 0
        5 => Float32x4, // transform col 1
        6 => Float32x4, // transform col 2
        7 => Float32x4, // transform col 3
        8 => Float32x4, // color
        9 => Float32    // depth
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Instance2D>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

impl Default for Instance2D {
    fn default() -> Self {
        Self::new(IDENTITY)
    }
}
