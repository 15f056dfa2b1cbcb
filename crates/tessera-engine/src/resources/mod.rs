//! Resource table.
//!
//! Owns every mesh, instance set, material table and texture the host has uploaded, keyed by
//! the host's ids. Replacing anything creates a new immutable [`Versioned`] object; the old one
//! is retired and handed to the frame scheduler, which releases it once no in-flight frame can
//! still read it.

mod snapshot;
mod table;
mod version;

pub use snapshot::TableSnapshot;
pub use table::ResourceTable;
pub use version::{
    Instances2DMeta, Instances2DVersion, Instances3DMeta, Instances3DVersion, MaterialRange,
    MaterialsMeta, MaterialsVersion, MeshMeta, MeshVersion, Retired, TextureMeta, TextureVersion,
    Versioned,
};
