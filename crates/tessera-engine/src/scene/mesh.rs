use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3D {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2  // uv
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 3],
    /// Non-zero when the fragment should sample the mesh texture.
    pub has_tex: u32,
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2D {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Uint32,    // has_tex
        2 => Float32x2, // uv
        3 => Float32x4  // color
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex2D>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Triangle-list mesh for the 3D pass.
///
/// An empty `indices` slice draws `vertices` directly.
#[derive(Debug, Copy, Clone)]
pub struct MeshData3D<'a> {
    pub vertices: &'a [Vertex3D],
    pub indices: &'a [u32],
}

impl MeshData3D<'_> {
    /// Number of vertices the draw call consumes.
    pub fn element_count(&self) -> usize {
        if self.indices.is_empty() {
            self.vertices.len()
        } else {
            self.indices.len()
        }
    }

    /// First index that points past the vertex array, if any.
    pub(crate) fn first_bad_index(&self) -> Option<(usize, u32)> {
        let n = self.vertices.len();
        self.indices
            .iter()
            .enumerate()
            .find(|&(_, &i)| i as usize >= n)
            .map(|(pos, &i)| (pos, i))
    }
}

/// Triangle-list mesh for the 2D overlay pass.
#[derive(Debug, Copy, Clone)]
pub struct MeshData2D<'a> {
    pub vertices: &'a [Vertex2D],
    /// Index into the texture set. Missing or out of range samples the white fallback.
    pub tex_id: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layouts_match_gpu_strides() {
        assert_eq!(std::mem::size_of::<Vertex3D>(), 32);
        assert_eq!(std::mem::size_of::<Vertex2D>(), 40);
        assert_eq!(Vertex3D::layout().array_stride, 32);
        assert_eq!(Vertex2D::layout().array_stride, 40);
    }

    #[test]
    fn element_count_prefers_indices() {
        let v = [Vertex3D::default(); 4];
        let indexed = MeshData3D { vertices: &v, indices: &[0, 1, 2, 2, 3, 0] };
        let plain = MeshData3D { vertices: &v, indices: &[] };
        assert_eq!(indexed.element_count(), 6);
        assert_eq!(plain.element_count(), 4);
    }

    #[test]
    fn first_bad_index_reports_position() {
        let v = [Vertex3D::default(); 3];
        let mesh = MeshData3D { vertices: &v, indices: &[0, 1, 2, 3] };
        assert_eq!(mesh.first_bad_index(), Some((3, 3)));
        let ok = MeshData3D { vertices: &v, indices: &[2, 1, 0] };
        assert_eq!(ok.first_bad_index(), None);
    }
}
