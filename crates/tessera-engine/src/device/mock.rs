//! Delayed-completion device for tests.
//!
//! Submissions stay incomplete until the test completes them (or the runtime waits on them).
//! Releasing any object an incomplete submission references panics, as does releasing an
//! object twice, so every test doubles as a use-after-free check.

use std::collections::{HashMap, HashSet};

use super::{DeviceError, RenderDevice, SubmissionId, SurfaceSize};
use crate::render::FramePlan;
use crate::scene::{DeviceMaterial, Instance2D, Instance3D, MeshData2D, MeshData3D, TextureData};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MockKind {
    Mesh,
    Instances,
    Materials,
    Texture,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MockHandle {
    pub id: u64,
    pub kind: MockKind,
}

/// What one submitted plan drew.
#[derive(Debug, Clone)]
pub struct MockFrame {
    pub submission: SubmissionId,
    pub slot: usize,
    /// `(mesh id, element count, instance count)` per 3D draw.
    pub draws_3d: Vec<(u32, u32, u32)>,
    /// `(material, instance count, texture handle)` per 3D batch, in draw order.
    pub batches_3d: Vec<(u32, u32, MockHandle)>,
    /// `(mesh id, instance count, texture handle)` per 2D draw.
    pub draws_2d: Vec<(u32, u32, MockHandle)>,
    refs: HashSet<MockHandle>,
}

#[derive(Debug, Default)]
pub struct MockDevice {
    next_handle: u64,
    next_submission: u64,
    completed_through: u64,
    instant: bool,

    live: HashSet<MockHandle>,
    in_flight: HashMap<usize, SubmissionId>,

    pub frames: Vec<MockFrame>,
    pub uploads: Vec<MockHandle>,
    pub texture_bytes: HashMap<MockHandle, Vec<u8>>,
    pub released: Vec<MockHandle>,
    pub waits: Vec<SubmissionId>,
    pub configured: Vec<SurfaceSize>,

    lost: Option<String>,
    fail_next_upload: Option<DeviceError>,
    fail_next_configure: Option<DeviceError>,
    /// Uploads larger than this fail with `OutOfMemory`.
    pub max_upload_bytes: Option<usize>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every submission completes as soon as it is polled.
    pub fn instant() -> Self {
        Self {
            instant: true,
            ..Self::default()
        }
    }

    /// Simulates the GPU finishing everything up to and including `id`.
    pub fn complete_through(&mut self, id: SubmissionId) {
        self.completed_through = self.completed_through.max(id.0);
    }

    pub fn fail_next_configure(&mut self, err: DeviceError) {
        self.fail_next_configure = Some(err);
    }

    pub fn lose(&mut self, reason: &str) {
        self.lost = Some(reason.to_string());
    }

    pub fn fail_next_upload(&mut self, err: DeviceError) {
        self.fail_next_upload = Some(err);
    }

    pub fn is_live(&self, handle: MockHandle) -> bool {
        self.live.contains(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn uploads_of(&self, kind: MockKind) -> usize {
        self.uploads.iter().filter(|h| h.kind == kind).count()
    }

    pub fn last_frame(&self) -> Option<&MockFrame> {
        self.frames.last()
    }

    fn is_complete(&self, id: SubmissionId) -> bool {
        id.0 <= self.completed_through
    }

    fn check_lost(&self) -> Result<(), DeviceError> {
        match &self.lost {
            Some(reason) => Err(DeviceError::Lost(reason.clone())),
            None => Ok(()),
        }
    }

    fn alloc(&mut self, kind: MockKind, bytes: usize) -> Result<MockHandle, DeviceError> {
        self.check_lost()?;
        if let Some(err) = self.fail_next_upload.take() {
            return Err(err);
        }
        if let Some(max) = self.max_upload_bytes
            && bytes > max
        {
            return Err(DeviceError::OutOfMemory(format!("{bytes} bytes exceeds {max}")));
        }
        self.next_handle += 1;
        let handle = MockHandle {
            id: self.next_handle,
            kind,
        };
        self.live.insert(handle);
        self.uploads.push(handle);
        Ok(handle)
    }

    fn free(&mut self, handle: MockHandle) {
        assert!(self.live.remove(&handle), "double release of {handle:?}");
        for frame in &self.frames {
            if !self.is_complete(frame.submission) && frame.refs.contains(&handle) {
                panic!(
                    "{handle:?} released while submission {:?} still reads it",
                    frame.submission
                );
            }
        }
        self.released.push(handle);
    }
}

impl RenderDevice for MockDevice {
    type Mesh = MockHandle;
    type Instances = MockHandle;
    type Materials = MockHandle;
    type Texture = MockHandle;

    fn upload_mesh_2d(&mut self, mesh: &MeshData2D<'_>) -> Result<MockHandle, DeviceError> {
        self.alloc(MockKind::Mesh, std::mem::size_of_val(mesh.vertices))
    }

    fn upload_mesh_3d(&mut self, mesh: &MeshData3D<'_>) -> Result<MockHandle, DeviceError> {
        let bytes = std::mem::size_of_val(mesh.vertices) + std::mem::size_of_val(mesh.indices);
        self.alloc(MockKind::Mesh, bytes)
    }

    fn upload_instances_2d(&mut self, instances: &[Instance2D]) -> Result<MockHandle, DeviceError> {
        self.alloc(MockKind::Instances, std::mem::size_of_val(instances))
    }

    fn upload_instances_3d(&mut self, instances: &[Instance3D]) -> Result<MockHandle, DeviceError> {
        self.alloc(MockKind::Instances, std::mem::size_of_val(instances))
    }

    fn upload_materials(&mut self, materials: &[DeviceMaterial]) -> Result<MockHandle, DeviceError> {
        self.alloc(MockKind::Materials, std::mem::size_of_val(materials))
    }

    fn upload_texture(&mut self, texture: &TextureData<'_>) -> Result<MockHandle, DeviceError> {
        let handle = self.alloc(MockKind::Texture, texture.bytes.len())?;
        self.texture_bytes.insert(handle, texture.bytes.to_vec());
        Ok(handle)
    }

    fn release_mesh(&mut self, mesh: MockHandle) {
        self.free(mesh);
    }

    fn release_instances(&mut self, instances: MockHandle) {
        self.free(instances);
    }

    fn release_materials(&mut self, materials: MockHandle) {
        self.free(materials);
    }

    fn release_texture(&mut self, texture: MockHandle) {
        self.free(texture);
    }

    fn configure_surface(&mut self, size: SurfaceSize) -> Result<(), DeviceError> {
        self.check_lost()?;
        if let Some(err) = self.fail_next_configure.take() {
            return Err(err);
        }
        self.configured.push(size);
        Ok(())
    }

    fn submit(&mut self, slot: usize, plan: &FramePlan<Self>) -> Result<SubmissionId, DeviceError> {
        self.check_lost()?;
        if let Some(&prev) = self.in_flight.get(&slot) {
            assert!(
                self.is_complete(prev),
                "slot {slot} reused while submission {prev:?} is in flight"
            );
        }

        self.next_submission += 1;
        let submission = SubmissionId(self.next_submission);

        let mut refs = HashSet::new();
        refs.insert(*plan.materials.gpu());
        let mut draws_3d = Vec::new();
        let mut batches_3d = Vec::new();
        for draw in &plan.draws_3d {
            refs.insert(*draw.mesh.gpu());
            refs.insert(*draw.instances.gpu());
            draws_3d.push((
                draw.mesh_id,
                draw.mesh.meta().element_count,
                draw.instances.meta().count,
            ));
            for batch in &draw.batches {
                refs.insert(*batch.texture.gpu());
                batches_3d.push((
                    batch.material,
                    batch.instances.end - batch.instances.start,
                    *batch.texture.gpu(),
                ));
            }
        }
        let mut draws_2d = Vec::new();
        for draw in &plan.draws_2d {
            refs.insert(*draw.mesh.gpu());
            refs.insert(*draw.instances.gpu());
            refs.insert(*draw.texture.gpu());
            draws_2d.push((draw.mesh_id, draw.instances.meta().count, *draw.texture.gpu()));
        }

        for handle in &refs {
            assert!(self.live.contains(handle), "plan references released {handle:?}");
        }

        self.in_flight.insert(slot, submission);
        self.frames.push(MockFrame {
            submission,
            slot,
            draws_3d,
            batches_3d,
            draws_2d,
            refs,
        });
        Ok(submission)
    }

    fn poll(&mut self, submission: SubmissionId) -> Result<bool, DeviceError> {
        self.check_lost()?;
        if self.instant {
            self.complete_through(submission);
        }
        Ok(self.is_complete(submission))
    }

    fn wait(&mut self, submission: SubmissionId) -> Result<(), DeviceError> {
        self.check_lost()?;
        self.waits.push(submission);
        self.complete_through(submission);
        Ok(())
    }
}
