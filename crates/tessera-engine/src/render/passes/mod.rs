//! wgpu encoders for [`FramePlan`](crate::render::FramePlan)s.

mod common;
mod mesh2d;
mod mesh3d;

pub use common::{
    BindLayouts, DEPTH_FORMAT, GpuInstances, GpuMaterials, GpuMesh, GpuTexture,
};
pub use mesh2d::Mesh2dPass;
pub use mesh3d::Mesh3dPass;
