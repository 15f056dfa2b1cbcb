//! The runtime instance: one resource table, one frame scheduler, one device.

use crate::config::RuntimeConfig;
use crate::device::{RenderDevice, SurfaceDescriptor, SurfaceSize, WgpuDevice, WindowHandles};
use crate::error::{Result, RuntimeError, Status};
use crate::frame::{FrameScheduler, FrameStats};
use crate::render::{FramePlan, FrameView};
use crate::resources::ResourceTable;
use crate::scene::{
    CameraView3D, DeviceMaterial, Instance2D, Instance3D, Mat4, MeshData2D, MeshData3D,
    TextureData,
};

/// An embeddable rendering instance.
///
/// Calls take `&mut self`; one caller drives an instance at a time. Every `set_*` returns
/// promptly and becomes visible at the next [`render`](Self::render). Dropping the instance
/// drains the GPU and releases everything it owns.
pub struct Runtime<D: RenderDevice = WgpuDevice> {
    device: D,
    /// `None` only after teardown.
    table: Option<ResourceTable<D>>,
    scheduler: FrameScheduler<D>,
    size: SurfaceSize,
    descriptor: Option<SurfaceDescriptor>,
    config: RuntimeConfig,

    last_status: Status,
    last_error: Option<String>,
    /// Sticky once set; the instance must be recreated.
    lost: Option<String>,
}

impl Runtime<WgpuDevice> {
    /// Resolves the window handles, brings up wgpu and creates the built-in resources.
    ///
    /// Nothing is left behind on failure.
    pub fn create(handles: WindowHandles, size: SurfaceSize, config: RuntimeConfig) -> Result<Self> {
        let desc = SurfaceDescriptor::resolve(handles, size, config.slot_count())?;
        let device = WgpuDevice::create(&desc, &config.gpu_init())?;
        log::info!(
            "runtime created: {}x{} @ {} ({} frames in flight, {:?})",
            size.width,
            size.height,
            size.scale,
            config.slot_count(),
            device.surface_format()
        );
        Self::assemble(device, size, Some(desc), config)
    }
}

impl<D: RenderDevice> Runtime<D> {
    /// Wires a runtime over an existing device.
    pub fn with_device(mut device: D, size: SurfaceSize, config: RuntimeConfig) -> Result<Self> {
        size.validate()?;
        device.configure_surface(size)?;
        Self::assemble(device, size, None, config)
    }

    fn assemble(
        mut device: D,
        size: SurfaceSize,
        descriptor: Option<SurfaceDescriptor>,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let table = ResourceTable::new(&mut device)?;
        Ok(Self {
            device,
            table: Some(table),
            scheduler: FrameScheduler::new(config.slot_count()),
            size,
            descriptor,
            config,
            last_status: Status::Ok,
            last_error: None,
            lost: None,
        })
    }

    // ── resources ────────────────────────────────────────────────────────────

    pub fn set_2d_mesh(&mut self, id: u32, mesh: MeshData2D<'_>) -> Result<()> {
        self.call("set_2d_mesh", |dev, table, _| table.set_mesh_2d(dev, id, mesh))
    }

    pub fn set_3d_mesh(&mut self, id: u32, mesh: MeshData3D<'_>) -> Result<()> {
        self.call("set_3d_mesh", |dev, table, _| table.set_mesh_3d(dev, id, mesh))
    }

    /// Removes 3D meshes and their instance sets. Unknown ids are ignored.
    pub fn unload_3d_meshes(&mut self, ids: &[u32]) -> Result<()> {
        self.call("unload_3d_meshes", |_, table, _| {
            table.unload_meshes_3d(ids);
            Ok(())
        })
    }

    pub fn set_2d_instances(&mut self, mesh_id: u32, instances: &[Instance2D]) -> Result<()> {
        self.call("set_2d_instances", |dev, table, _| {
            table.set_instances_2d(dev, mesh_id, instances)
        })
    }

    pub fn set_3d_instances(&mut self, mesh_id: u32, instances: &[Instance3D]) -> Result<()> {
        self.call("set_3d_instances", |dev, table, _| {
            table.set_instances_3d(dev, mesh_id, instances)
        })
    }

    pub fn set_materials(&mut self, materials: &[DeviceMaterial]) -> Result<()> {
        self.call("set_materials", |dev, table, _| table.set_materials(dev, materials))
    }

    /// Replaces the texture array. Only indices in `changed` (and indices past the previous
    /// length) are uploaded; every other entry keeps its current contents.
    pub fn set_textures(&mut self, textures: &[TextureData<'_>], changed: &[u32]) -> Result<()> {
        self.call("set_textures", |dev, table, _| {
            table.set_textures(dev, textures, changed)
        })
    }

    // ── frames ───────────────────────────────────────────────────────────────

    /// Records and submits one frame of the current table contents.
    ///
    /// Blocks only when every frame slot is still in flight, and then only until the oldest
    /// frame completes.
    pub fn render(&mut self, matrix_2d: Mat4, camera: CameraView3D) -> Result<()> {
        let view = FrameView {
            matrix_2d,
            camera,
            surface: self.size,
            clear_color: self.config.clear_color,
            light_direction: self.config.light_direction,
        };
        self.call("render", |dev, table, scheduler| {
            let slot = scheduler.acquire(dev)?;
            let plan = FramePlan::build(scheduler.next_frame_index(), slot, table.snapshot(), &view);
            scheduler.submit(slot, plan, dev)?;
            Ok(())
        })
    }

    /// Waits until every submitted frame has completed and releases everything deferred.
    pub fn synchronize(&mut self) -> Result<()> {
        self.call("synchronize", |dev, _, scheduler| scheduler.synchronize(dev))
    }

    /// Reconfigures the surface for a new drawable size.
    ///
    /// An invalid size fails without touching anything. Frames in flight target the old
    /// configuration, so they are drained first.
    pub fn resize(&mut self, width: u32, height: u32, scale: f64) -> Result<()> {
        let size = SurfaceSize::new(width, height, scale);
        let current = self.size;
        let result = self.call("resize", |dev, _, scheduler| {
            let Some(size) = current.resized_to(size)? else {
                return Ok(false);
            };
            scheduler.synchronize(dev)?;
            dev.configure_surface(size)?;
            Ok(true)
        });

        if let Ok(true) = result {
            log::debug!("surface resized to {width}x{height} @ {scale}");
            self.size = size;
            if let Some(desc) = &mut self.descriptor {
                desc.size = size;
            }
        }
        result.map(|_| ())
    }

    /// Drains the GPU and releases every resource. Same as dropping the instance.
    pub fn destroy(mut self) {
        self.teardown();
    }

    // ── queries ──────────────────────────────────────────────────────────────

    /// Outcome of the most recent call.
    pub fn last_status(&self) -> Status {
        self.last_status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_lost(&self) -> bool {
        self.lost.is_some()
    }

    pub fn stats(&self) -> FrameStats {
        self.scheduler.stats()
    }

    pub fn surface(&self) -> SurfaceSize {
        self.size
    }

    /// The resolved window surface; `None` for runtimes built with [`with_device`](Self::with_device).
    pub fn surface_descriptor(&self) -> Option<&SurfaceDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &FrameScheduler<D> {
        &self.scheduler
    }

    /// Records an error raised before a call reached the runtime, such as host data rejected
    /// at the C boundary, so [`last_status`](Self::last_status) reflects it.
    pub fn reject(&mut self, op: &str, err: RuntimeError) {
        let _ = self.record::<()>(op, Err(err));
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    #[cfg(test)]
    pub(crate) fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Runs one operation, hands superseded versions to the scheduler and records the outcome.
    fn call<T>(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut D, &mut ResourceTable<D>, &mut FrameScheduler<D>) -> Result<T>,
    ) -> Result<T> {
        let result = match (&self.lost, self.table.as_mut()) {
            (Some(reason), _) => Err(RuntimeError::DeviceLost(reason.clone())),
            (None, None) => Err(RuntimeError::DeviceLost("instance destroyed".into())),
            (None, Some(table)) => {
                let result = f(&mut self.device, table, &mut self.scheduler);
                let retired = table.drain_retired();
                self.scheduler.defer(retired, &mut self.device);
                result
            }
        };
        self.record(op, result)
    }

    fn record<T>(&mut self, op: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                self.last_status = Status::Ok;
                self.last_error = None;
            }
            Err(e) => {
                self.last_status = e.status();
                self.last_error = Some(e.to_string());
                if let RuntimeError::DeviceLost(reason) = e {
                    if self.lost.is_none() {
                        log::error!("{op}: {e}; instance is unusable");
                        self.lost = Some(reason.clone());
                    }
                } else {
                    log::warn!("{op}: {e}");
                }
            }
        }
        result
    }

    fn teardown(&mut self) {
        let Some(table) = self.table.take() else { return };

        if self.lost.is_none() {
            match self.scheduler.synchronize(&mut self.device) {
                Ok(()) => {
                    table.release_all(&mut self.device);
                    self.scheduler.abandon();
                    log::info!("runtime destroyed ({} frames)", self.scheduler.stats().frames_submitted);
                    return;
                }
                Err(e) => log::error!("drain before destroy failed: {e}"),
            }
        }

        // Nothing can complete any more; drop host-side state and let the device go.
        self.scheduler.abandon();
        drop(table);
        log::info!("runtime destroyed without draining (device lost)");
    }
}

impl<D: RenderDevice> Drop for Runtime<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
