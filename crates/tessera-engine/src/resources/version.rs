use std::ops::Range;
use std::sync::Arc;

use crate::device::RenderDevice;
use crate::scene::{DeviceMaterial, Instance3D, TextureFormat};

/// One immutable GPU-resident version of a resource.
///
/// `generation` is the table generation the version was published into.
#[derive(Debug)]
pub struct Versioned<G, M> {
    generation: u64,
    gpu: G,
    meta: M,
}

impl<G, M> Versioned<G, M> {
    pub(crate) fn new(generation: u64, gpu: G, meta: M) -> Self {
        Self { generation, gpu, meta }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn meta(&self) -> &M {
        &self.meta
    }

    pub(crate) fn into_gpu(self) -> G {
        self.gpu
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshMeta {
    pub vertex_count: u32,
    /// Vertices consumed per instance: the index count for indexed meshes.
    pub element_count: u32,
    pub indexed: bool,
    /// 2D meshes only.
    pub tex_id: Option<u32>,
}

/// Contiguous run of instances sharing one material index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRange {
    pub material: u32,
    pub instances: Range<u32>,
}

impl MaterialRange {
    pub fn len(&self) -> u32 {
        self.instances.end - self.instances.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instances3DMeta {
    pub count: u32,
    /// Batches in ascending material order, covering `0..count`.
    pub batches: Vec<MaterialRange>,
}

impl Instances3DMeta {
    /// Stable-sorts `instances` by material and returns the sorted copy with its batches.
    pub(crate) fn group_by_material(instances: &[Instance3D]) -> (Vec<Instance3D>, Self) {
        let mut sorted = instances.to_vec();
        sorted.sort_by_key(|i| i.material);

        let mut batches: Vec<MaterialRange> = Vec::new();
        for (pos, inst) in sorted.iter().enumerate() {
            let pos = pos as u32;
            match batches.last_mut() {
                Some(b) if b.material == inst.material => b.instances.end = pos + 1,
                _ => batches.push(MaterialRange {
                    material: inst.material,
                    instances: pos..pos + 1,
                }),
            }
        }

        let meta = Self {
            count: sorted.len() as u32,
            batches,
        };
        (sorted, meta)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instances2DMeta {
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialsMeta {
    /// CPU copy, consulted when resolving per-batch textures.
    pub records: Vec<DeviceMaterial>,
    pub builtin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureMeta {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub builtin: bool,
}

pub type MeshVersion<D> = Versioned<<D as RenderDevice>::Mesh, MeshMeta>;
pub type Instances3DVersion<D> = Versioned<<D as RenderDevice>::Instances, Instances3DMeta>;
pub type Instances2DVersion<D> = Versioned<<D as RenderDevice>::Instances, Instances2DMeta>;
pub type MaterialsVersion<D> = Versioned<<D as RenderDevice>::Materials, MaterialsMeta>;
pub type TextureVersion<D> = Versioned<<D as RenderDevice>::Texture, TextureMeta>;

/// A superseded version waiting for the GPU to finish with it.
pub enum Retired<D: RenderDevice> {
    Mesh(Arc<MeshVersion<D>>),
    Instances3D(Arc<Instances3DVersion<D>>),
    Instances2D(Arc<Instances2DVersion<D>>),
    Materials(Arc<MaterialsVersion<D>>),
    Texture(Arc<TextureVersion<D>>),
}

impl<D: RenderDevice> Retired<D> {
    pub fn generation(&self) -> u64 {
        match self {
            Retired::Mesh(v) => v.generation(),
            Retired::Instances3D(v) => v.generation(),
            Retired::Instances2D(v) => v.generation(),
            Retired::Materials(v) => v.generation(),
            Retired::Texture(v) => v.generation(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Retired::Mesh(_) => "mesh",
            Retired::Instances3D(_) | Retired::Instances2D(_) => "instance set",
            Retired::Materials(_) => "material table",
            Retired::Texture(_) => "texture",
        }
    }

    /// Hands the GPU object back to `device`.
    ///
    /// Returns `false` if something still shares the version; it is then dropped without an
    /// explicit release and freed when the last reference goes away.
    pub fn release(self, device: &mut D) -> bool {
        let kind = self.kind();
        let generation = self.generation();
        let released = match self {
            Retired::Mesh(v) => Arc::try_unwrap(v).map(|v| device.release_mesh(v.into_gpu())).is_ok(),
            Retired::Instances3D(v) => Arc::try_unwrap(v)
                .map(|v| device.release_instances(v.into_gpu()))
                .is_ok(),
            Retired::Instances2D(v) => Arc::try_unwrap(v)
                .map(|v| device.release_instances(v.into_gpu()))
                .is_ok(),
            Retired::Materials(v) => Arc::try_unwrap(v)
                .map(|v| device.release_materials(v.into_gpu()))
                .is_ok(),
            Retired::Texture(v) => Arc::try_unwrap(v)
                .map(|v| device.release_texture(v.into_gpu()))
                .is_ok(),
        };
        if !released {
            log::warn!("{kind} from generation {generation} still shared at release; dropping");
        }
        released
    }
}

impl<D: RenderDevice> std::fmt::Debug for Retired<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Retired({} @ gen {})", self.kind(), self.generation())
    }
}
