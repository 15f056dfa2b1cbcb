use std::collections::BTreeMap;
use std::sync::Arc;

use super::version::{
    Instances2DVersion, Instances3DVersion, MaterialsVersion, MeshVersion, TextureVersion,
};
use crate::device::RenderDevice;

/// Immutable view of the resource table at one generation boundary.
///
/// Holds shared references, so the versions it names stay alive for as long as the
/// snapshot (or a frame plan built from it) does.
pub struct TableSnapshot<D: RenderDevice> {
    pub generation: u64,
    pub meshes_2d: BTreeMap<u32, Arc<MeshVersion<D>>>,
    pub meshes_3d: BTreeMap<u32, Arc<MeshVersion<D>>>,
    pub instances_2d: BTreeMap<u32, Arc<Instances2DVersion<D>>>,
    pub instances_3d: BTreeMap<u32, Arc<Instances3DVersion<D>>>,
    pub materials: Arc<MaterialsVersion<D>>,
    pub textures: Vec<Option<Arc<TextureVersion<D>>>>,
    pub white_texture: Arc<TextureVersion<D>>,
}

impl<D: RenderDevice> TableSnapshot<D> {
    /// Resolves a texture reference, falling back to white for missing or out-of-range
    /// indices. The flag is `true` when the fallback was used.
    pub fn texture(&self, index: Option<u32>) -> (Arc<TextureVersion<D>>, bool) {
        let found = index.and_then(|i| self.textures.get(i as usize)).and_then(Option::as_ref);
        match found {
            Some(t) => (t.clone(), false),
            None => (self.white_texture.clone(), index.is_some()),
        }
    }
}
