//! Demo host.
//!
//! Drives a runtime the way an embedding host would: it hands over the native window as the
//! raw handle triple, streams a grid of spinning cubes plus a 2D overlay bar into the
//! resource table every frame, and forwards resizes.

use std::time::Instant;

use anyhow::{Context, Result, bail};
use glam::{Mat4, Quat, Vec3};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use winit::window::{Window, WindowId};

use tessera_engine::device::surface::{WAYLAND_HANDLE, XCB_HANDLE, XLIB_HANDLE};
use tessera_engine::logging::{LoggingConfig, init_logging};
use tessera_engine::{
    CameraView3D, DeviceMaterial, Instance2D, Instance3D, MeshData2D, MeshData3D, Platform,
    Runtime, RuntimeConfig, SurfaceSize, Vertex2D, Vertex3D, WindowHandles,
};

const CUBE: u32 = 1;
const BAR: u32 = 1;
const GRID: i32 = 6;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut studio = Studio::default();
    event_loop
        .run_app(&mut studio)
        .context("winit event loop terminated with error")?;
    Ok(())
}

#[derive(Default)]
struct Studio {
    /// Declared before `window`: the runtime must be dropped while the window still exists.
    runtime: Option<Runtime>,
    window: Option<Window>,
    started: Option<Instant>,
    paused: bool,
}

impl Studio {
    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Tessera Studio")
            .with_inner_size(LogicalSize::new(1024.0, 640.0));
        let window = event_loop.create_window(attrs).context("failed to create window")?;

        let (h0, h1, h2) = handle_triple(&window)?;
        let handles = WindowHandles::from_triple(Platform::current(), h0, h1, h2)?;
        let size = window.inner_size();
        let surface = SurfaceSize::new(size.width.max(1), size.height.max(1), window.scale_factor());

        let mut runtime = Runtime::create(handles, surface, RuntimeConfig::from_env())?;
        load_scene(&mut runtime)?;

        self.runtime = Some(runtime);
        self.window = Some(window);
        self.started = Some(Instant::now());
        Ok(())
    }

    fn frame(&mut self) {
        let (Some(runtime), Some(started)) = (self.runtime.as_mut(), self.started) else {
            return;
        };
        let t = if self.paused { 0.0 } else { started.elapsed().as_secs_f32() };

        let _ = runtime.set_3d_instances(CUBE, &cube_grid(t));
        let surface = runtime.surface();
        let (w, h) = surface.logical_size();
        let overlay = pixel_space(w as f32, h as f32).to_cols_array();

        let bar = Mat4::from_scale_rotation_translation(
            Vec3::new(w as f32 - 32.0, 24.0, 1.0),
            Quat::IDENTITY,
            Vec3::new(16.0, h as f32 - 40.0, 0.0),
        );
        let progress = Mat4::from_scale_rotation_translation(
            Vec3::new((w as f32 - 32.0) * (t * 0.1).fract(), 24.0, 1.0),
            Quat::IDENTITY,
            Vec3::new(16.0, h as f32 - 40.0, 0.0),
        );
        let _ = runtime.set_2d_instances(
            BAR,
            &[
                Instance2D::new(bar.to_cols_array())
                    .with_color([0.1, 0.1, 0.12, 0.8])
                    .with_depth(0.5),
                Instance2D::new(progress.to_cols_array())
                    .with_color([0.3, 0.7, 1.0, 1.0])
                    .with_depth(0.1),
            ],
        );

        let camera = CameraView3D::look_at([0.0, 9.0, 14.0], [0.0, 0.0, 0.0]);
        if let Err(e) = runtime.render(overlay, camera) {
            if e.is_fatal() {
                log::error!("render failed: {e}; closing");
                self.runtime = None;
            }
        }
    }

    fn resize(&mut self) {
        let (Some(runtime), Some(window)) = (self.runtime.as_mut(), self.window.as_ref()) else {
            return;
        };
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            // minimized
            return;
        }
        let _ = runtime.resize(size.width, size.height, window.scale_factor());
    }
}

impl ApplicationHandler for Studio {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.open(event_loop) {
            log::error!("failed to start studio: {e:#}");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(runtime) = self.runtime.take() {
                    log::info!("{:?}", runtime.stats());
                    runtime.destroy();
                }
                self.window = None;
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => self.resize(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Space),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.paused = !self.paused,
            WindowEvent::RedrawRequested => {
                self.frame();
                if self.runtime.is_none() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

/// Encodes winit's native handles as the `(h0, h1, h2)` triple a C host would pass.
fn handle_triple(window: &Window) -> Result<(u64, u64, u64)> {
    let raw_window = window.window_handle().context("no window handle")?.as_raw();
    let raw_display = window.display_handle().context("no display handle")?.as_raw();

    let addr = |p: std::ptr::NonNull<std::ffi::c_void>| p.as_ptr() as usize as u64;
    let triple = match (raw_window, raw_display) {
        (RawWindowHandle::Win32(w), _) => (
            w.hwnd.get() as u64,
            w.hinstance.map_or(0, |h| h.get() as u64),
            0,
        ),
        (RawWindowHandle::AppKit(w), _) => (addr(w.ns_view), 0, 0),
        (RawWindowHandle::Xlib(w), RawDisplayHandle::Xlib(d)) => {
            (w.window as u64, d.display.map_or(0, addr), XLIB_HANDLE)
        }
        (RawWindowHandle::Xcb(w), RawDisplayHandle::Xcb(d)) => {
            (w.window.get() as u64, d.connection.map_or(0, addr), XCB_HANDLE)
        }
        (RawWindowHandle::Wayland(w), RawDisplayHandle::Wayland(d)) => {
            (addr(w.surface), addr(d.display), WAYLAND_HANDLE)
        }
        (w, d) => bail!("unsupported window system: {w:?} / {d:?}"),
    };
    Ok(triple)
}

fn load_scene(runtime: &mut Runtime) -> Result<()> {
    let (vertices, indices) = cube_mesh();
    runtime.set_3d_mesh(CUBE, MeshData3D { vertices: &vertices, indices: &indices })?;

    let materials: Vec<DeviceMaterial> = (0..4)
        .map(|i| {
            let hue = i as f32 / 4.0;
            DeviceMaterial::with_color([
                0.5 + 0.5 * (hue * 6.28).cos(),
                0.5 + 0.5 * ((hue + 0.33) * 6.28).cos(),
                0.5 + 0.5 * ((hue + 0.66) * 6.28).cos(),
                1.0,
            ])
        })
        .collect();
    runtime.set_materials(&materials)?;

    let quad = unit_quad();
    runtime.set_2d_mesh(BAR, MeshData2D { vertices: &quad, tex_id: None })?;
    Ok(())
}

fn cube_grid(t: f32) -> Vec<Instance3D> {
    let mut instances = Vec::with_capacity((GRID * GRID) as usize);
    for x in 0..GRID {
        for z in 0..GRID {
            let pos = Vec3::new(
                (x - GRID / 2) as f32 * 1.8 + 0.9,
                0.0,
                (z - GRID / 2) as f32 * 1.8 + 0.9,
            );
            let spin = Quat::from_rotation_y(t + (x + z) as f32 * 0.3);
            let transform = Mat4::from_rotation_translation(spin, pos);
            instances.push(Instance3D::new(transform.to_cols_array(), ((x + z) % 4) as u32));
        }
    }
    instances
}

/// Maps logical pixels (origin top-left, y down) to clip space.
fn pixel_space(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0)
}

fn unit_quad() -> Vec<Vertex2D> {
    [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
        .into_iter()
        .map(|[x, y]| Vertex2D {
            position: [x, y, 0.0],
            has_tex: 0,
            uv: [x, y],
            color: [1.0; 4],
        })
        .collect()
}

fn cube_mesh() -> (Vec<Vertex3D>, Vec<u32>) {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [-1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
        let base = vertices.len() as u32;
        for (du, dv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let p = n * 0.5 + u * du + v * dv;
            vertices.push(Vertex3D {
                position: p.into(),
                normal,
                uv: [du + 0.5, dv + 0.5],
            });
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}
