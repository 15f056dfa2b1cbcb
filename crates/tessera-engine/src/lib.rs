//! Tessera engine crate.
//!
//! An embeddable rendering runtime: a versioned resource table that hosts stream meshes,
//! instances, materials and textures into, and a frames-in-flight scheduler that draws it
//! without ever freeing something the GPU may still read.

pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod logging;
pub mod render;
pub mod resources;
pub mod runtime;
pub mod scene;

pub use config::{PowerPreference, RuntimeConfig, MAX_FRAMES_IN_FLIGHT};
pub use device::{Platform, SurfaceSize, WindowHandles};
pub use error::{ResourceKind, Result, RuntimeError, Status};
pub use frame::{FrameStats, SlotState};
pub use runtime::Runtime;
pub use scene::{
    CameraView3D, DeviceMaterial, IDENTITY, Instance2D, Instance3D, Mat4, MeshData2D, MeshData3D,
    TextureData, TextureFormat, Vertex2D, Vertex3D,
};
