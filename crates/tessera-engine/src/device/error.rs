use thiserror::Error;

/// Failure reported by a [`RenderDevice`](super::RenderDevice).
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DeviceError {
    /// Allocation would exceed device memory or a device limit.
    #[error("out of device memory: {0}")]
    OutOfMemory(String),

    /// The device stopped responding or was removed.
    #[error("{0}")]
    Lost(String),

    /// The surface cannot be configured or presented to.
    #[error("{0}")]
    Surface(String),
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip presenting the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}
