//! `repr(C)` views of host data and their conversion into checked engine types.
//!
//! Nothing here copies: every conversion borrows the host's memory for the duration of one
//! call.

use std::ffi::c_void;

use bitvec::prelude::{BitSlice, Lsb0};

use tessera_engine::{
    Instance2D, Instance3D, Mat4, ResourceKind, RuntimeError, TextureFormat, Vertex2D, Vertex3D,
};

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Column-major 4x4 matrix passed by value.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Matrix4 {
    pub cols: Mat4,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct MeshData2D {
    pub vertices: *const Vertex2D,
    pub num_vertices: u32,
    /// Texture array index, or negative for none.
    pub tex_id: i32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct MeshData3D {
    pub vertices: *const Vertex3D,
    pub num_vertices: u32,
    /// Optional triangle list indices; null with `num_indices == 0` draws vertices in order.
    pub indices: *const u32,
    pub num_indices: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct InstancesData2D {
    pub instances: *const Instance2D,
    pub num_instances: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct InstancesData3D {
    pub instances: *const Instance3D,
    pub num_instances: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    /// `0` = BGRA8, `1` = RGBA8.
    pub format: u32,
    /// Every mip level packed back to back, largest first.
    pub bytes: *const u8,
    pub num_bytes: u64,
}

/// Borrows `len` elements at `ptr`.
///
/// # Safety
/// When non-null, `ptr` must point to `len` initialized values that stay valid and unmodified
/// for `'a`.
pub unsafe fn slice<'a, T>(ptr: *const T, len: usize, kind: ResourceKind) -> Result<&'a [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(invalid(kind, format!("null pointer with {len} elements")));
    }
    if !ptr.is_aligned() {
        return Err(invalid(kind, format!("pointer {ptr:p} is misaligned")));
    }
    if len.checked_mul(size_of::<T>()).is_none_or(|bytes| bytes > isize::MAX as usize) {
        return Err(invalid(kind, format!("{len} elements overflow the address space")));
    }
    // SAFETY: non-null, aligned, in-bounds per the caller's contract.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

fn invalid(kind: ResourceKind, reason: String) -> RuntimeError {
    RuntimeError::InvalidData { kind, reason }
}

impl MeshData2D {
    /// # Safety
    /// `vertices` must satisfy [`slice`]'s contract for `num_vertices` elements.
    pub unsafe fn to_engine<'a>(&self) -> Result<tessera_engine::MeshData2D<'a>> {
        let vertices =
            unsafe { slice(self.vertices, self.num_vertices as usize, ResourceKind::Mesh2D)? };
        Ok(tessera_engine::MeshData2D {
            vertices,
            tex_id: u32::try_from(self.tex_id).ok(),
        })
    }
}

impl MeshData3D {
    /// # Safety
    /// `vertices` and `indices` must satisfy [`slice`]'s contract for their counts.
    pub unsafe fn to_engine<'a>(&self) -> Result<tessera_engine::MeshData3D<'a>> {
        let vertices =
            unsafe { slice(self.vertices, self.num_vertices as usize, ResourceKind::Mesh3D)? };
        let indices =
            unsafe { slice(self.indices, self.num_indices as usize, ResourceKind::Mesh3D)? };
        Ok(tessera_engine::MeshData3D { vertices, indices })
    }
}

impl InstancesData2D {
    /// # Safety
    /// `instances` must satisfy [`slice`]'s contract for `num_instances` elements.
    pub unsafe fn to_engine<'a>(&self) -> Result<&'a [Instance2D]> {
        unsafe { slice(self.instances, self.num_instances as usize, ResourceKind::Instances2D) }
    }
}

impl InstancesData3D {
    /// # Safety
    /// `instances` must satisfy [`slice`]'s contract for `num_instances` elements.
    pub unsafe fn to_engine<'a>(&self) -> Result<&'a [Instance3D]> {
        unsafe { slice(self.instances, self.num_instances as usize, ResourceKind::Instances3D) }
    }
}

impl TextureData {
    /// # Safety
    /// `bytes` must satisfy [`slice`]'s contract for `num_bytes` bytes.
    pub unsafe fn to_engine<'a>(&self) -> Result<tessera_engine::TextureData<'a>> {
        let format = match self.format {
            0 => TextureFormat::Bgra8,
            1 => TextureFormat::Rgba8,
            other => {
                return Err(invalid(ResourceKind::Texture, format!("unknown format {other}")));
            }
        };
        let len = usize::try_from(self.num_bytes).map_err(|_| {
            invalid(ResourceKind::Texture, format!("{} bytes do not fit in memory", self.num_bytes))
        })?;
        let bytes = unsafe { slice(self.bytes, len, ResourceKind::Texture)? };
        Ok(tessera_engine::TextureData {
            width: self.width,
            height: self.height,
            mip_levels: self.mip_levels,
            bytes,
            format,
        })
    }
}

/// Decodes the `changed` bitset of `set_textures`: bit `i` of word `i / 32` marks texture `i`.
/// A null bitset marks every texture as changed.
///
/// # Safety
/// When non-null, `bits` must point to `num_textures.div_ceil(32)` words.
pub unsafe fn changed_indices(bits: *const u32, num_textures: u32) -> Result<Vec<u32>> {
    if bits.is_null() {
        return Ok((0..num_textures).collect());
    }
    let words = num_textures.div_ceil(32) as usize;
    let words = unsafe { slice(bits, words, ResourceKind::Texture)? };
    let bits = BitSlice::<u32, Lsb0>::from_slice(words);
    Ok(bits[..num_textures as usize]
        .iter_ones()
        .map(|i| i as u32)
        .collect())
}

/// Recovers the instance behind an opaque handle.
///
/// # Safety
/// `instance` must be null or a pointer returned by `create_instance` that has not been
/// destroyed, with no other call using it concurrently.
pub(crate) unsafe fn instance_mut<'a>(instance: *mut c_void) -> Option<&'a mut tessera_engine::Runtime> {
    unsafe { instance.cast::<tessera_engine::Runtime>().as_mut() }
}
