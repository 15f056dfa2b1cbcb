//! Frame recording.
//!
//! [`FramePlan::build`] turns a resource table snapshot plus the per-frame view into an
//! immutable list of draws. The wgpu passes in [`passes`] encode a plan; each pass owns its
//! pipeline and per-slot uniform buffers.
//!
//! Convention:
//! - 3D geometry is right handed, the camera builds view/projection.
//! - 2D geometry goes through the host's overlay matrix straight to clip space.

mod ctx;
pub mod passes;
mod plan;

pub use ctx::{RenderCtx, RenderTarget};
pub use plan::{
    Batch3D, CameraUniform, Draw2D, Draw3D, FramePlan, FrameView, OverlayUniform, PASS_ORDER,
    PassKind, PlanStats,
};
