//! GPU device boundary.
//!
//! The runtime core talks to the graphics device only through [`RenderDevice`]:
//! - uploading immutable GPU resources and releasing them again
//! - (re)configuring the presentation surface
//! - submitting a recorded [`FramePlan`] and tracking its completion
//!
//! [`WgpuDevice`] is the production implementation.

mod error;
mod frame;
mod gpu;
mod init;
#[cfg(test)]
pub(crate) mod mock;
pub mod surface;

pub use error::{DeviceError, SurfaceErrorAction};
pub use gpu::WgpuDevice;
pub use init::GpuInit;
pub use surface::{Platform, SurfaceDescriptor, SurfaceSize, WindowHandles};

use crate::render::FramePlan;
use crate::scene::{DeviceMaterial, Instance2D, Instance3D, MeshData2D, MeshData3D, TextureData};

/// Monotonic id of one queue submission. Later submissions compare greater.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubmissionId(pub u64);

/// Everything the runtime needs from a graphics device.
///
/// Upload methods create *new* GPU objects; nothing handed out is ever written again.
/// `release_*` is only called once no incomplete submission references the object.
pub trait RenderDevice: Sized {
    type Mesh: Send + Sync + 'static;
    type Instances: Send + Sync + 'static;
    type Materials: Send + Sync + 'static;
    type Texture: Send + Sync + 'static;

    fn upload_mesh_2d(&mut self, mesh: &MeshData2D<'_>) -> Result<Self::Mesh, DeviceError>;
    fn upload_mesh_3d(&mut self, mesh: &MeshData3D<'_>) -> Result<Self::Mesh, DeviceError>;
    fn upload_instances_2d(&mut self, instances: &[Instance2D])
    -> Result<Self::Instances, DeviceError>;
    fn upload_instances_3d(&mut self, instances: &[Instance3D])
    -> Result<Self::Instances, DeviceError>;
    fn upload_materials(&mut self, materials: &[DeviceMaterial])
    -> Result<Self::Materials, DeviceError>;
    fn upload_texture(&mut self, texture: &TextureData<'_>) -> Result<Self::Texture, DeviceError>;

    fn release_mesh(&mut self, mesh: Self::Mesh);
    fn release_instances(&mut self, instances: Self::Instances);
    fn release_materials(&mut self, materials: Self::Materials);
    fn release_texture(&mut self, texture: Self::Texture);

    /// Reconfigures the swapchain and recreates size-dependent targets.
    fn configure_surface(&mut self, size: SurfaceSize) -> Result<(), DeviceError>;

    /// Records and submits `plan` using the per-slot state of `slot`.
    fn submit(&mut self, slot: usize, plan: &FramePlan<Self>) -> Result<SubmissionId, DeviceError>;

    /// Non-blocking completion check.
    fn poll(&mut self, submission: SubmissionId) -> Result<bool, DeviceError>;

    /// Blocks until `submission` (and therefore every earlier one) has completed.
    fn wait(&mut self, submission: SubmissionId) -> Result<(), DeviceError>;
}
