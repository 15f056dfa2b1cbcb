//! Runtime error taxonomy.
//!
//! Every fallible runtime call returns [`RuntimeError`]. Only [`RuntimeError::DeviceLost`]
//! is terminal for an instance; everything else is contained to the call that raised it.

use std::fmt;

use thiserror::Error;

use crate::device::DeviceError;

/// Which resource space an error refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Mesh2D,
    Mesh3D,
    Instances2D,
    Instances3D,
    Material,
    Texture,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Mesh2D => "2d mesh",
            ResourceKind::Mesh3D => "3d mesh",
            ResourceKind::Instances2D => "2d instance set",
            ResourceKind::Instances3D => "3d instance set",
            ResourceKind::Material => "material",
            ResourceKind::Texture => "texture",
        };
        f.write_str(name)
    }
}

/// Error returned by runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An id or index that does not exist or is out of range.
    #[error("unknown {kind} id {id}")]
    InvalidId { kind: ResourceKind, id: u32 },

    /// Host data that cannot be uploaded as given (empty mesh, short texture, bad index).
    #[error("invalid {kind} data: {reason}")]
    InvalidData { kind: ResourceKind, reason: String },

    /// GPU memory or a device limit would be exceeded. The previous version stays live.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The graphics device is unusable. The instance must be recreated.
    #[error("device lost: {0}")]
    DeviceLost(String),

    /// Degenerate surface size or unusable window handles.
    #[error("invalid surface: {0}")]
    SurfaceInvalid(String),

    /// Instance creation failed; nothing was constructed.
    #[error("initialization failed: {0:#}")]
    Init(#[from] anyhow::Error),
}

impl RuntimeError {
    pub(crate) fn invalid_data(kind: ResourceKind, reason: impl Into<String>) -> Self {
        RuntimeError::InvalidData {
            kind,
            reason: reason.into(),
        }
    }

    /// Status code reported through the C ABI status query.
    pub fn status(&self) -> Status {
        match self {
            RuntimeError::InvalidId { .. } => Status::InvalidId,
            RuntimeError::InvalidData { .. } => Status::InvalidData,
            RuntimeError::ResourceExhausted(_) => Status::ResourceExhausted,
            RuntimeError::DeviceLost(_) => Status::DeviceLost,
            RuntimeError::SurfaceInvalid(_) => Status::SurfaceInvalid,
            RuntimeError::Init(_) => Status::InitFailed,
        }
    }

    /// Returns `true` for the instance-terminal condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RuntimeError::DeviceLost(_))
    }
}

impl From<DeviceError> for RuntimeError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::OutOfMemory(msg) => RuntimeError::ResourceExhausted(msg),
            DeviceError::Lost(msg) => RuntimeError::DeviceLost(msg),
            DeviceError::Surface(msg) => RuntimeError::SurfaceInvalid(msg),
        }
    }
}

/// Outcome of the most recent call, as seen by C hosts.
#[repr(i32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Status {
    #[default]
    Ok = 0,
    InvalidId = 1,
    InvalidData = 2,
    ResourceExhausted = 3,
    DeviceLost = 4,
    SurfaceInvalid = 5,
    InitFailed = 6,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_map_onto_taxonomy() {
        let e: RuntimeError = DeviceError::OutOfMemory("vbo".into()).into();
        assert_eq!(e.status(), Status::ResourceExhausted);
        assert!(!e.is_fatal());

        let e: RuntimeError = DeviceError::Lost("reset".into()).into();
        assert_eq!(e.status(), Status::DeviceLost);
        assert!(e.is_fatal());

        let e: RuntimeError = DeviceError::Surface("gone".into()).into();
        assert_eq!(e.status(), Status::SurfaceInvalid);
    }

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(Status::Ok as i32, 0);
        assert_eq!(Status::InvalidId as i32, 1);
        assert_eq!(Status::DeviceLost as i32, 4);
        assert_eq!(Status::InitFailed as i32, 6);
    }

    #[test]
    fn invalid_id_message_names_the_space() {
        let e = RuntimeError::InvalidId { kind: ResourceKind::Mesh2D, id: 5 };
        assert_eq!(e.to_string(), "unknown 2d mesh id 5");
    }
}
