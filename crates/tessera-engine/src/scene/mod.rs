//! Host-facing scene data.
//!
//! These are the shapes the host streams in. Anything the GPU reads directly is
//! `repr(C)` + `Pod` so it can be uploaded without conversion.

mod camera;
mod instance;
mod material;
mod mesh;
mod texture;

pub use camera::CameraView3D;
pub use instance::{Instance2D, Instance3D};
pub use material::DeviceMaterial;
pub use mesh::{MeshData2D, MeshData3D, Vertex2D, Vertex3D};
pub use texture::{TextureData, TextureFormat};

/// Column-major 4x4 matrix, index `col * 4 + row` (WGSL convention).
pub type Mat4 = [f32; 16];

pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];
