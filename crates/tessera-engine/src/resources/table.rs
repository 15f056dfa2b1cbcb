use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::snapshot::TableSnapshot;
use super::version::{
    Instances2DMeta, Instances2DVersion, Instances3DMeta, Instances3DVersion, MaterialsMeta,
    MaterialsVersion, MeshMeta, MeshVersion, Retired, TextureMeta, TextureVersion, Versioned,
};
use crate::device::RenderDevice;
use crate::error::{ResourceKind, Result, RuntimeError};
use crate::scene::{
    DeviceMaterial, Instance2D, Instance3D, MeshData2D, MeshData3D, TextureData, TextureFormat,
};

const WHITE_TEXEL: [u8; 4] = [255, 255, 255, 255];

/// Id-keyed store of the current version of every host resource.
///
/// Writers never touch a published version. They upload a replacement, swap it in, and push
/// the old one onto the retired list; [`ResourceTable::drain_retired`] hands that list to the
/// frame scheduler.
pub struct ResourceTable<D: RenderDevice> {
    generation: u64,

    meshes_2d: BTreeMap<u32, Arc<MeshVersion<D>>>,
    meshes_3d: BTreeMap<u32, Arc<MeshVersion<D>>>,
    instances_2d: BTreeMap<u32, Arc<Instances2DVersion<D>>>,
    instances_3d: BTreeMap<u32, Arc<Instances3DVersion<D>>>,
    materials: Arc<MaterialsVersion<D>>,
    textures: Vec<Option<Arc<TextureVersion<D>>>>,

    default_materials: Arc<MaterialsVersion<D>>,
    white_texture: Arc<TextureVersion<D>>,

    retired: Vec<Retired<D>>,
}

impl<D: RenderDevice> ResourceTable<D> {
    /// Creates an empty table and uploads the built-in material and white texture.
    pub fn new(device: &mut D) -> Result<Self> {
        let material = [DeviceMaterial::fallback()];
        let default_materials = Arc::new(Versioned::new(
            0,
            device.upload_materials(&material)?,
            MaterialsMeta {
                records: material.to_vec(),
                builtin: true,
            },
        ));

        let white = TextureData {
            width: 1,
            height: 1,
            mip_levels: 1,
            bytes: &WHITE_TEXEL,
            format: TextureFormat::Rgba8,
        };
        let white_gpu = match device.upload_texture(&white) {
            Ok(gpu) => gpu,
            Err(e) => {
                if let Ok(v) = Arc::try_unwrap(default_materials) {
                    device.release_materials(v.into_gpu());
                }
                return Err(e.into());
            }
        };
        let white_texture = Arc::new(Versioned::new(
            0,
            white_gpu,
            TextureMeta {
                width: 1,
                height: 1,
                mip_levels: 1,
                format: TextureFormat::Rgba8,
                builtin: true,
            },
        ));

        Ok(Self {
            generation: 0,
            meshes_2d: BTreeMap::new(),
            meshes_3d: BTreeMap::new(),
            instances_2d: BTreeMap::new(),
            instances_3d: BTreeMap::new(),
            materials: default_materials.clone(),
            textures: Vec::new(),
            default_materials,
            white_texture,
            retired: Vec::new(),
        })
    }

    /// Generation new versions are published into.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── meshes ────────────────────────────────────────────────────────────

    pub fn set_mesh_2d(&mut self, device: &mut D, id: u32, mesh: MeshData2D<'_>) -> Result<()> {
        if mesh.vertices.is_empty() {
            return Err(RuntimeError::invalid_data(ResourceKind::Mesh2D, "mesh has no vertices"));
        }
        let gpu = device.upload_mesh_2d(&mesh)?;
        let count = mesh.vertices.len() as u32;
        let version = Versioned::new(
            self.generation,
            gpu,
            MeshMeta {
                vertex_count: count,
                element_count: count,
                indexed: false,
                tex_id: mesh.tex_id,
            },
        );
        if let Some(old) = self.meshes_2d.insert(id, Arc::new(version)) {
            self.retired.push(Retired::Mesh(old));
        }
        log::debug!("2d mesh {id}: {count} vertices (gen {})", self.generation);
        Ok(())
    }

    pub fn set_mesh_3d(&mut self, device: &mut D, id: u32, mesh: MeshData3D<'_>) -> Result<()> {
        if mesh.vertices.is_empty() {
            return Err(RuntimeError::invalid_data(ResourceKind::Mesh3D, "mesh has no vertices"));
        }
        if let Some((pos, index)) = mesh.first_bad_index() {
            return Err(RuntimeError::invalid_data(
                ResourceKind::Mesh3D,
                format!(
                    "index {index} at position {pos} exceeds vertex count {}",
                    mesh.vertices.len()
                ),
            ));
        }
        let gpu = device.upload_mesh_3d(&mesh)?;
        let version = Versioned::new(
            self.generation,
            gpu,
            MeshMeta {
                vertex_count: mesh.vertices.len() as u32,
                element_count: mesh.element_count() as u32,
                indexed: !mesh.indices.is_empty(),
                tex_id: None,
            },
        );
        if let Some(old) = self.meshes_3d.insert(id, Arc::new(version)) {
            self.retired.push(Retired::Mesh(old));
        }
        log::debug!(
            "3d mesh {id}: {} vertices, {} indices (gen {})",
            mesh.vertices.len(),
            mesh.indices.len(),
            self.generation
        );
        Ok(())
    }

    /// Removes the listed 3D meshes and their instance sets. Unknown ids are skipped.
    pub fn unload_meshes_3d(&mut self, ids: &[u32]) {
        for &id in ids {
            match self.meshes_3d.remove(&id) {
                Some(mesh) => {
                    self.retired.push(Retired::Mesh(mesh));
                    if let Some(inst) = self.instances_3d.remove(&id) {
                        self.retired.push(Retired::Instances3D(inst));
                    }
                    log::debug!("3d mesh {id} unloaded");
                }
                None => log::debug!("unload of unknown 3d mesh {id} ignored"),
            }
        }
    }

    // ── instances ─────────────────────────────────────────────────────────

    /// Replaces the instance set of 2D mesh `id`. An empty slice clears it.
    pub fn set_instances_2d(&mut self, device: &mut D, id: u32, instances: &[Instance2D]) -> Result<()> {
        if !self.meshes_2d.contains_key(&id) {
            return Err(RuntimeError::InvalidId {
                kind: ResourceKind::Mesh2D,
                id,
            });
        }
        let next = if instances.is_empty() {
            None
        } else {
            let gpu = device.upload_instances_2d(instances)?;
            let meta = Instances2DMeta {
                count: instances.len() as u32,
            };
            Some(Arc::new(Versioned::new(self.generation, gpu, meta)))
        };
        let old = match next {
            Some(v) => self.instances_2d.insert(id, v),
            None => self.instances_2d.remove(&id),
        };
        if let Some(old) = old {
            self.retired.push(Retired::Instances2D(old));
        }
        log::debug!("2d mesh {id}: {} instances", instances.len());
        Ok(())
    }

    /// Replaces the instance set of 3D mesh `id`, grouped by material. An empty slice clears it.
    pub fn set_instances_3d(&mut self, device: &mut D, id: u32, instances: &[Instance3D]) -> Result<()> {
        if !self.meshes_3d.contains_key(&id) {
            return Err(RuntimeError::InvalidId {
                kind: ResourceKind::Mesh3D,
                id,
            });
        }
        let next = if instances.is_empty() {
            None
        } else {
            let (sorted, meta) = Instances3DMeta::group_by_material(instances);
            let gpu = device.upload_instances_3d(&sorted)?;
            Some(Arc::new(Versioned::new(self.generation, gpu, meta)))
        };
        let old = match next {
            Some(v) => self.instances_3d.insert(id, v),
            None => self.instances_3d.remove(&id),
        };
        if let Some(old) = old {
            self.retired.push(Retired::Instances3D(old));
        }
        log::debug!("3d mesh {id}: {} instances", instances.len());
        Ok(())
    }

    // ── materials ─────────────────────────────────────────────────────────

    /// Replaces the whole material table. An empty slice restores the built-in material.
    pub fn set_materials(&mut self, device: &mut D, materials: &[DeviceMaterial]) -> Result<()> {
        let next = if materials.is_empty() {
            self.default_materials.clone()
        } else {
            let gpu = device.upload_materials(materials)?;
            Arc::new(Versioned::new(
                self.generation,
                gpu,
                MaterialsMeta {
                    records: materials.to_vec(),
                    builtin: false,
                },
            ))
        };
        let old = std::mem::replace(&mut self.materials, next);
        if !old.meta().builtin {
            self.retired.push(Retired::Materials(old));
        }
        log::debug!("material table: {} entries", materials.len());
        Ok(())
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Applies a texture set update.
    ///
    /// The set takes `textures.len()` entries. Indices in `changed`, and entries that hold no
    /// version yet (new tail entries, or earlier uploads that failed), are uploaded; every
    /// other entry keeps its exact previous version.
    /// A failing entry keeps its previous version while the rest still apply; the first
    /// error is returned.
    pub fn set_textures(&mut self, device: &mut D, textures: &[TextureData<'_>], changed: &[u32]) -> Result<()> {
        let old_len = self.textures.len();
        let new_len = textures.len();

        if new_len < old_len {
            for old in self.textures.drain(new_len..).flatten() {
                self.retired.push(Retired::Texture(old));
            }
        }
        self.textures.resize(new_len, None);

        let mut first_err: Option<RuntimeError> = None;
        let mut todo: BTreeSet<usize> =
            (0..new_len).filter(|&i| self.textures[i].is_none()).collect();
        for &idx in changed {
            if (idx as usize) < new_len {
                todo.insert(idx as usize);
            } else {
                log::warn!("changed texture index {idx} out of range (set has {new_len})");
                first_err.get_or_insert(RuntimeError::InvalidId {
                    kind: ResourceKind::Texture,
                    id: idx,
                });
            }
        }

        let mut uploaded = 0usize;
        for idx in todo {
            match self.upload_texture(device, &textures[idx]) {
                Ok(version) => {
                    if let Some(old) = self.textures[idx].replace(Arc::new(version)) {
                        self.retired.push(Retired::Texture(old));
                    }
                    uploaded += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!("texture {idx} not updated: {e}");
                    first_err.get_or_insert(e);
                }
            }
        }

        log::debug!("texture set: {new_len} entries, {uploaded} uploaded");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn upload_texture(&mut self, device: &mut D, data: &TextureData<'_>) -> Result<TextureVersion<D>> {
        if let Some(reason) = data.problem() {
            return Err(RuntimeError::invalid_data(ResourceKind::Texture, reason));
        }
        let gpu = device.upload_texture(data)?;
        Ok(Versioned::new(
            self.generation,
            gpu,
            TextureMeta {
                width: data.width,
                height: data.height,
                mip_levels: data.mip_levels,
                format: data.format,
                builtin: false,
            },
        ))
    }

    // ── read side ─────────────────────────────────────────────────────────

    /// Consistent view of everything published so far. Later writes land in the next
    /// generation and never affect the returned snapshot.
    pub fn snapshot(&mut self) -> TableSnapshot<D> {
        let snapshot = TableSnapshot {
            generation: self.generation,
            meshes_2d: self.meshes_2d.clone(),
            meshes_3d: self.meshes_3d.clone(),
            instances_2d: self.instances_2d.clone(),
            instances_3d: self.instances_3d.clone(),
            materials: self.materials.clone(),
            textures: self.textures.clone(),
            white_texture: self.white_texture.clone(),
        };
        self.generation += 1;
        snapshot
    }

    /// Takes every version superseded since the last call.
    pub fn drain_retired(&mut self) -> Vec<Retired<D>> {
        std::mem::take(&mut self.retired)
    }

    pub fn mesh_count(&self) -> (usize, usize) {
        (self.meshes_2d.len(), self.meshes_3d.len())
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Releases every version including the built-ins. No frame may be in flight.
    pub fn release_all(mut self, device: &mut D) {
        let mut all = self.drain_retired();
        all.extend(std::mem::take(&mut self.meshes_2d).into_values().map(Retired::Mesh));
        all.extend(std::mem::take(&mut self.meshes_3d).into_values().map(Retired::Mesh));
        all.extend(
            std::mem::take(&mut self.instances_2d)
                .into_values()
                .map(Retired::Instances2D),
        );
        all.extend(
            std::mem::take(&mut self.instances_3d)
                .into_values()
                .map(Retired::Instances3D),
        );
        all.extend(
            std::mem::take(&mut self.textures)
                .into_iter()
                .flatten()
                .map(Retired::Texture),
        );

        let Self {
            materials,
            default_materials,
            white_texture,
            ..
        } = self;
        if !materials.meta().builtin {
            all.push(Retired::Materials(materials));
        } else {
            drop(materials);
        }
        all.push(Retired::Materials(default_materials));
        all.push(Retired::Texture(white_texture));

        let total = all.len();
        let released = all
            .into_iter()
            .map(|r| r.release(device))
            .filter(|&ok| ok)
            .count();
        log::debug!("resource table released {released}/{total} versions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceError;
    use crate::device::mock::{MockDevice, MockKind};
    use crate::scene::{IDENTITY, Vertex2D, Vertex3D};

    fn table() -> (MockDevice, ResourceTable<MockDevice>) {
        let mut dev = MockDevice::new();
        let table = ResourceTable::new(&mut dev).unwrap();
        (dev, table)
    }

    fn tri3() -> [Vertex3D; 3] {
        [Vertex3D::default(); 3]
    }

    fn tex(bytes: &[u8]) -> TextureData<'_> {
        TextureData {
            width: 1,
            height: 1,
            mip_levels: 1,
            bytes,
            format: TextureFormat::Rgba8,
        }
    }

    // ── meshes ────────────────────────────────────────────────────────────

    #[test]
    fn new_table_uploads_builtins() {
        let (dev, table) = table();
        assert_eq!(dev.uploads_of(MockKind::Materials), 1);
        assert_eq!(dev.uploads_of(MockKind::Texture), 1);
        assert_eq!(table.mesh_count(), (0, 0));
    }

    #[test]
    fn replacing_a_mesh_retires_the_old_version() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        assert!(table.drain_retired().is_empty());
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[0, 1, 2] }).unwrap();
        let retired = table.drain_retired();
        assert_eq!(retired.len(), 1);
        assert!(matches!(retired[0], Retired::Mesh(_)));
    }

    #[test]
    fn empty_mesh_keeps_previous_version() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        let before = table.snapshot().meshes_3d[&1].gpu().id;

        let err = table
            .set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &[], indices: &[] })
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidData { .. }));
        assert_eq!(table.snapshot().meshes_3d[&1].gpu().id, before);
        assert!(table.drain_retired().is_empty());
    }

    #[test]
    fn out_of_range_index_is_rejected_before_upload() {
        let (mut dev, mut table) = table();
        let v = tri3();
        let uploads = dev.uploads.len();
        let err = table
            .set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[0, 1, 5] })
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidData { kind: ResourceKind::Mesh3D, .. }));
        assert_eq!(dev.uploads.len(), uploads);
    }

    #[test]
    fn exhausted_upload_keeps_previous_version() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        dev.fail_next_upload(DeviceError::OutOfMemory("vbo".into()));
        let err = table
            .set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] })
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ResourceExhausted(_)));
        assert!(table.snapshot().meshes_3d.contains_key(&1));
        assert!(table.drain_retired().is_empty());
    }

    #[test]
    fn unload_retires_mesh_and_instances_and_ignores_unknown_ids() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 4, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        table.set_instances_3d(&mut dev, 4, &[Instance3D::default()]).unwrap();

        table.unload_meshes_3d(&[99, 4, 4]);
        assert_eq!(table.drain_retired().len(), 2);
        assert_eq!(table.mesh_count(), (0, 0));

        table.unload_meshes_3d(&[1, 2, 3]);
        assert!(table.drain_retired().is_empty());
    }

    // ── instances ─────────────────────────────────────────────────────────

    #[test]
    fn instances_require_their_mesh() {
        let (mut dev, mut table) = table();
        let err = table.set_instances_2d(&mut dev, 3, &[Instance2D::default()]).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidId { kind: ResourceKind::Mesh2D, id: 3 }));
        assert_eq!(dev.uploads_of(MockKind::Instances), 0);

        let v = [Vertex2D::default(); 3];
        table.set_mesh_2d(&mut dev, 3, MeshData2D { vertices: &v, tex_id: None }).unwrap();
        table.set_instances_2d(&mut dev, 3, &[Instance2D::default()]).unwrap();
        assert_eq!(table.snapshot().instances_2d[&3].meta().count, 1);
    }

    #[test]
    fn mesh_replacement_keeps_instances() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        table.set_instances_3d(&mut dev, 1, &[Instance3D::default(); 2]).unwrap();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        assert_eq!(table.snapshot().instances_3d[&1].meta().count, 2);
    }

    #[test]
    fn empty_instance_slice_clears_the_set() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        table.set_instances_3d(&mut dev, 1, &[Instance3D::new(IDENTITY, 1)]).unwrap();
        table.drain_retired();
        table.set_instances_3d(&mut dev, 1, &[]).unwrap();
        assert!(!table.snapshot().instances_3d.contains_key(&1));
        assert_eq!(table.drain_retired().len(), 1);
    }

    // ── materials ─────────────────────────────────────────────────────────

    #[test]
    fn builtin_material_is_never_retired() {
        let (mut dev, mut table) = table();
        table.set_materials(&mut dev, &[]).unwrap();
        assert!(table.drain_retired().is_empty());

        table.set_materials(&mut dev, &[DeviceMaterial::default(); 3]).unwrap();
        assert!(table.drain_retired().is_empty());
        table.set_materials(&mut dev, &[]).unwrap();
        let retired = table.drain_retired();
        assert_eq!(retired.len(), 1);
        assert!(table.snapshot().materials.meta().builtin);
    }

    // ── textures ──────────────────────────────────────────────────────────

    #[test]
    fn unlisted_textures_keep_their_version() {
        let (mut dev, mut table) = table();
        let a = [1u8, 1, 1, 1];
        let b = [2u8, 2, 2, 2];
        let c = [3u8, 3, 3, 3];
        table.set_textures(&mut dev, &[tex(&a), tex(&b), tex(&c)], &[]).unwrap();
        let before = table.snapshot();
        let uploads = dev.uploads_of(MockKind::Texture);

        let b2 = [9u8, 9, 9, 9];
        table.set_textures(&mut dev, &[tex(&a), tex(&b2), tex(&c)], &[1]).unwrap();
        let after = table.snapshot();

        assert_eq!(dev.uploads_of(MockKind::Texture), uploads + 1);
        for idx in [0usize, 2] {
            let old = before.textures[idx].as_ref().unwrap();
            let new = after.textures[idx].as_ref().unwrap();
            assert!(Arc::ptr_eq(old, new));
            assert_eq!(dev.texture_bytes[new.gpu()], dev.texture_bytes[old.gpu()]);
        }
        let new_b = after.textures[1].as_ref().unwrap();
        assert_eq!(dev.texture_bytes[new_b.gpu()], b2.to_vec());
        assert_eq!(table.drain_retired().len(), 1);
    }

    #[test]
    fn growing_uploads_new_tail_and_shrinking_retires_it() {
        let (mut dev, mut table) = table();
        let px = [0u8; 4];
        table.set_textures(&mut dev, &[tex(&px)], &[]).unwrap();
        table.set_textures(&mut dev, &[tex(&px), tex(&px), tex(&px)], &[]).unwrap();
        assert_eq!(table.texture_count(), 3);
        assert_eq!(dev.uploads_of(MockKind::Texture), 1 + 3);
        assert!(table.drain_retired().is_empty());

        table.set_textures(&mut dev, &[tex(&px)], &[]).unwrap();
        assert_eq!(table.texture_count(), 1);
        assert_eq!(table.drain_retired().len(), 2);
    }

    #[test]
    fn bad_entries_are_skipped_and_first_error_returned() {
        let (mut dev, mut table) = table();
        let px = [7u8; 4];
        table.set_textures(&mut dev, &[tex(&px), tex(&px)], &[]).unwrap();
        let keep = table.snapshot().textures[0].clone().unwrap();

        let short: [u8; 0] = [];
        let fresh = [8u8; 4];
        let err = table
            .set_textures(&mut dev, &[tex(&short), tex(&fresh)], &[0, 1, 7])
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidId { kind: ResourceKind::Texture, id: 7 }));

        let snap = table.snapshot();
        assert!(Arc::ptr_eq(snap.textures[0].as_ref().unwrap(), &keep));
        let t1 = snap.textures[1].as_ref().unwrap();
        assert_eq!(dev.texture_bytes[t1.gpu()], fresh.to_vec());
    }

    #[test]
    fn failed_texture_is_retried_on_next_update() {
        let (mut dev, mut table) = table();
        let px = [5u8; 4];
        table.set_textures(&mut dev, &[tex(&px)], &[]).unwrap();

        dev.fail_next_upload(DeviceError::OutOfMemory("texture".into()));
        assert!(table.set_textures(&mut dev, &[tex(&px), tex(&px)], &[]).is_err());
        assert!(table.snapshot().textures[1].is_none());
        let uploads = dev.uploads_of(MockKind::Texture);

        table.set_textures(&mut dev, &[tex(&px), tex(&px)], &[]).unwrap();
        assert_eq!(dev.uploads_of(MockKind::Texture), uploads + 1);
        let snap = table.snapshot();
        let t1 = snap.textures[1].as_ref().unwrap();
        assert_eq!(dev.texture_bytes[t1.gpu()], px.to_vec());
    }

    // ── snapshots ─────────────────────────────────────────────────────────

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        let snap = table.snapshot();
        assert_eq!(snap.generation, 0);
        assert_eq!(table.generation(), 1);

        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[0, 1, 2] }).unwrap();
        table.set_mesh_3d(&mut dev, 2, MeshData3D { vertices: &v, indices: &[] }).unwrap();

        assert_eq!(snap.meshes_3d.len(), 1);
        assert!(!snap.meshes_3d[&1].meta().indexed);
        assert_eq!(snap.meshes_3d[&1].generation(), 0);
        assert_eq!(table.snapshot().meshes_3d[&1].generation(), 1);
    }

    #[test]
    fn release_all_frees_everything() {
        let (mut dev, mut table) = table();
        let v = tri3();
        table.set_mesh_3d(&mut dev, 1, MeshData3D { vertices: &v, indices: &[] }).unwrap();
        table.set_instances_3d(&mut dev, 1, &[Instance3D::default()]).unwrap();
        table.set_materials(&mut dev, &[DeviceMaterial::default()]).unwrap();
        table.set_textures(&mut dev, &[tex(&[0u8; 4])], &[]).unwrap();
        table.release_all(&mut dev);
        assert_eq!(dev.live_count(), 0);
    }
}
