use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use super::frame::{DepthTarget, GpuFrame};
use super::surface::{self, SurfaceDescriptor, SurfaceSize};
use super::{DeviceError, GpuInit, RenderDevice, SubmissionId, SurfaceErrorAction};
use crate::render::passes::{
    BindLayouts, GpuInstances, GpuMaterials, GpuMesh, GpuTexture, Mesh2dPass, Mesh3dPass,
};
use crate::render::{FramePlan, RenderCtx, RenderTarget};
use crate::scene::{DeviceMaterial, Instance2D, Instance3D, MeshData2D, MeshData3D, TextureData};

struct InFlight {
    id: SubmissionId,
    index: wgpu::SubmissionIndex,
    done: Arc<AtomicBool>,
}

/// Owns wgpu core objects, the surface configuration and the pass encoders.
///
/// This type is the production [`RenderDevice`]:
/// - creates and stores Device/Queue and the Surface bound to the host window
/// - uploads immutable buffers/textures and destroys them on release
/// - encodes frame plans and tracks queue completion per submission
pub struct WgpuDevice {
    /// Surface bound to the host's native window.
    ///
    /// The host guarantees the window outlives the runtime instance.
    surface: wgpu::Surface<'static>,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    depth: DepthTarget,
    layouts: BindLayouts,
    mesh3d: Mesh3dPass,
    mesh2d: Mesh2dPass,

    in_flight: VecDeque<InFlight>,
    next_submission: u64,
    completed_through: u64,

    /// Set from the device-lost callback.
    lost: Arc<Mutex<Option<String>>>,
    frame_timeout: Duration,
}

impl WgpuDevice {
    /// Creates a device bound to the resolved surface, blocking on adapter/device futures.
    pub fn create(desc: &SurfaceDescriptor, init: &GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(desc, init))
    }

    /// Creates a device bound to the resolved surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(desc: &SurfaceDescriptor, init: &GpuInit) -> Result<Self> {
        let size = desc.size;
        anyhow::ensure!(size.width > 0 && size.height > 0, "surface has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let (raw_window_handle, raw_display_handle) = desc.handles.to_raw();
        // SAFETY: the handles were validated non-null by the surface resolver and the host
        // keeps the native window alive until the instance is destroyed.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle,
                raw_window_handle,
            })
        }
        .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let max_dimension = adapter.limits().max_texture_dimension_2d;
        if size.width > max_dimension || size.height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {}x{}",
                size.width,
                size.height
            );
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tessera device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps, init.alpha_mode);
        let present_mode = if caps.present_modes.contains(&init.present_mode)
            || matches!(
                init.present_mode,
                wgpu::PresentMode::AutoVsync | wgpu::PresentMode::AutoNoVsync
            ) {
            init.present_mode
        } else {
            log::warn!("{:?} unsupported, falling back to Fifo", init.present_mode);
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: desc.buffering,
        };
        surface.configure(&device, &config);

        let lost = Arc::new(Mutex::new(None));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::error!("device lost ({reason:?}): {message}");
            if let Ok(mut slot) = flag.lock() {
                *slot = Some(format!("{reason:?}: {message}"));
            }
        });

        let slots = desc.buffering as usize;
        let layouts = BindLayouts::new(&device);
        let mesh3d = Mesh3dPass::new(&device, &layouts, slots);
        let mesh2d = Mesh2dPass::new(&device, &layouts, slots);
        let depth = DepthTarget::new(&device, size.width, size.height);

        log::info!(
            "surface {}x{} {:?}, {:?}, {} frame(s) in flight",
            size.width,
            size.height,
            format,
            present_mode,
            slots
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth,
            layouts,
            mesh3d,
            mesh2d,
            in_flight: VecDeque::new(),
            next_submission: 0,
            completed_through: 0,
            lost,
            frame_timeout: init.frame_timeout,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn check_lost(&self) -> Result<(), DeviceError> {
        match self.lost.lock().ok().and_then(|g| g.clone()) {
            Some(reason) => Err(DeviceError::Lost(reason)),
            None => Ok(()),
        }
    }

    fn mark_lost(&self, reason: String) -> DeviceError {
        if let Ok(mut slot) = self.lost.lock() {
            slot.get_or_insert_with(|| reason.clone());
        }
        DeviceError::Lost(reason)
    }

    fn check_buffer(&self, what: &str, bytes: u64) -> Result<(), DeviceError> {
        self.check_lost()?;
        let max = self.device.limits().max_buffer_size;
        if bytes > max {
            return Err(DeviceError::OutOfMemory(format!(
                "{what} needs {bytes} bytes, device limit is {max}"
            )));
        }
        Ok(())
    }

    fn vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<wgpu::Buffer, DeviceError> {
        self.check_buffer(label, contents.len() as u64)?;
        Ok(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        }))
    }

    /// Moves completed submissions off the in-flight queue.
    fn collect_completed(&mut self) -> Result<(), DeviceError> {
        self.device
            .poll(wgpu::PollType::Poll)
            .map_err(|e| self.mark_lost(format!("poll failed: {e}")))?;
        while let Some(front) = self.in_flight.front() {
            if !front.done.load(Ordering::Acquire) {
                break;
            }
            self.completed_through = front.id.0;
            self.in_flight.pop_front();
        }
        self.check_lost()
    }

    /// Acquires the next swapchain image, reacting to surface errors.
    ///
    /// `Ok(None)` means this frame is not presented.
    fn acquire(&mut self) -> Result<Option<GpuFrame>, DeviceError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(GpuFrame::new(texture))),
            Err(err) => match surface::surface_error_action(&err) {
                SurfaceErrorAction::Reconfigured => {
                    log::debug!("surface {err}; reconfiguring");
                    self.surface.configure(&self.device, &self.config);
                    Ok(None)
                }
                SurfaceErrorAction::SkipFrame => {
                    log::debug!("surface {err}; skipping frame");
                    Ok(None)
                }
                SurfaceErrorAction::Fatal => {
                    Err(DeviceError::OutOfMemory(format!("swapchain: {err}")))
                }
            },
        }
    }
}

impl RenderDevice for WgpuDevice {
    type Mesh = GpuMesh;
    type Instances = GpuInstances;
    type Materials = GpuMaterials;
    type Texture = GpuTexture;

    fn upload_mesh_2d(&mut self, mesh: &MeshData2D<'_>) -> Result<GpuMesh, DeviceError> {
        let vertices = self.vertex_buffer("tessera 2d mesh vbo", bytemuck::cast_slice(mesh.vertices))?;
        Ok(GpuMesh {
            vertices,
            indices: None,
            element_count: mesh.vertices.len() as u32,
        })
    }

    fn upload_mesh_3d(&mut self, mesh: &MeshData3D<'_>) -> Result<GpuMesh, DeviceError> {
        self.check_buffer("tessera 3d mesh ibo", std::mem::size_of_val(mesh.indices) as u64)?;
        let vertices = self.vertex_buffer("tessera 3d mesh vbo", bytemuck::cast_slice(mesh.vertices))?;
        let indices = (!mesh.indices.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tessera 3d mesh ibo"),
                contents: bytemuck::cast_slice(mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
        Ok(GpuMesh {
            vertices,
            indices,
            element_count: mesh.element_count() as u32,
        })
    }

    fn upload_instances_2d(&mut self, instances: &[Instance2D]) -> Result<GpuInstances, DeviceError> {
        let buffer = self.vertex_buffer("tessera 2d instances", bytemuck::cast_slice(instances))?;
        Ok(GpuInstances {
            buffer,
            count: instances.len() as u32,
        })
    }

    fn upload_instances_3d(&mut self, instances: &[Instance3D]) -> Result<GpuInstances, DeviceError> {
        let buffer = self.vertex_buffer("tessera 3d instances", bytemuck::cast_slice(instances))?;
        Ok(GpuInstances {
            buffer,
            count: instances.len() as u32,
        })
    }

    fn upload_materials(&mut self, materials: &[DeviceMaterial]) -> Result<GpuMaterials, DeviceError> {
        let bytes = std::mem::size_of_val(materials) as u64;
        self.check_buffer("tessera materials", bytes)?;
        let max_binding = self.device.limits().max_storage_buffer_binding_size as u64;
        if bytes > max_binding {
            return Err(DeviceError::OutOfMemory(format!(
                "{} materials exceed the storage binding limit of {max_binding} bytes",
                materials.len()
            )));
        }

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera materials"),
            contents: bytemuck::cast_slice(materials),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera materials bind group"),
            layout: &self.layouts.materials,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Ok(GpuMaterials { buffer, bind_group })
    }

    fn upload_texture(&mut self, data: &TextureData<'_>) -> Result<GpuTexture, DeviceError> {
        self.check_lost()?;
        let max = self.device.limits().max_texture_dimension_2d;
        if data.width > max || data.height > max {
            return Err(DeviceError::OutOfMemory(format!(
                "texture {}x{} exceeds max dimension {max}",
                data.width, data.height
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tessera texture"),
            size: wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: data.mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: data.format.to_wgpu(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for level in 0..data.mip_levels {
            let (w, h) = data.mip_level_width_height(level);
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data.level_bytes(level),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera texture bind group"),
            layout: &self.layouts.texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.layouts.sampler),
                },
            ],
        });
        Ok(GpuTexture { texture, bind_group })
    }

    fn release_mesh(&mut self, mesh: GpuMesh) {
        mesh.destroy();
    }

    fn release_instances(&mut self, instances: GpuInstances) {
        instances.buffer.destroy();
    }

    fn release_materials(&mut self, materials: GpuMaterials) {
        materials.buffer.destroy();
    }

    fn release_texture(&mut self, texture: GpuTexture) {
        texture.texture.destroy();
    }

    /// Reconfigures the surface after a resize.
    fn configure_surface(&mut self, size: SurfaceSize) -> Result<(), DeviceError> {
        self.check_lost()?;
        let max = self.device.limits().max_texture_dimension_2d;
        if size.width > max || size.height > max {
            return Err(DeviceError::Surface(format!(
                "{}x{} exceeds max dimension {max}",
                size.width, size.height
            )));
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth.ensure_size(&self.device, size.width, size.height);
        log::debug!("surface reconfigured to {}x{}", size.width, size.height);
        Ok(())
    }

    fn submit(&mut self, slot: usize, plan: &FramePlan<Self>) -> Result<SubmissionId, DeviceError> {
        self.check_lost()?;
        log::trace!(
            "frame {} slot {slot}: table gen {}, {} 3d / {} 2d draws",
            plan.frame_index,
            plan.generation,
            plan.draws_3d.len(),
            plan.draws_2d.len()
        );

        self.mesh3d.write_uniforms(&self.queue, slot, &plan.camera);
        self.mesh2d.write_uniforms(&self.queue, slot, &plan.overlay);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tessera frame encoder"),
            });

        let frame = self.acquire()?;
        if let Some(frame) = &frame {
            let ctx = RenderCtx::new(&self.device, &self.queue, self.config.format);
            let mut target = RenderTarget::new(&mut encoder, &frame.view, &self.depth.view);
            self.mesh3d.encode(&ctx, &self.layouts, &mut target, plan);
            self.mesh2d.encode(&ctx, &self.layouts, &mut target, plan);
        }
        let index = self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }

        self.next_submission += 1;
        let id = SubmissionId(self.next_submission);
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        self.queue
            .on_submitted_work_done(move || flag.store(true, Ordering::Release));
        self.in_flight.push_back(InFlight { id, index, done });
        Ok(id)
    }

    fn poll(&mut self, submission: SubmissionId) -> Result<bool, DeviceError> {
        self.check_lost()?;
        if submission.0 <= self.completed_through {
            return Ok(true);
        }
        self.collect_completed()?;
        Ok(submission.0 <= self.completed_through)
    }

    fn wait(&mut self, submission: SubmissionId) -> Result<(), DeviceError> {
        if self.poll(submission)? {
            return Ok(());
        }
        let Some(index) = self
            .in_flight
            .iter()
            .find(|f| f.id == submission)
            .map(|f| f.index.clone())
        else {
            return Ok(());
        };
        match self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(index),
            timeout: Some(self.frame_timeout),
        }) {
            Ok(_) => {}
            Err(e) => return Err(self.mark_lost(wait_failure(&e, submission, self.frame_timeout))),
        }
        // A successful wait means every submission up to `index` has finished.
        while self.in_flight.front().is_some_and(|f| f.id <= submission) {
            self.in_flight.pop_front();
        }
        self.completed_through = self.completed_through.max(submission.0);
        self.collect_completed()?;
        Ok(())
    }
}

/// Reason recorded when a blocking wait fails; any failure here ends the device.
fn wait_failure(err: &wgpu::PollError, submission: SubmissionId, timeout: Duration) -> String {
    match err {
        wgpu::PollError::Timeout => {
            format!("submission {} did not complete within {timeout:?}", submission.0)
        }
        other => format!("wait on submission {} failed: {other}", submission.0),
    }
}
