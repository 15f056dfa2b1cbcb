//! C ABI for the Tessera runtime.
//!
//! Every call takes the opaque pointer returned by [`create_instance`] first and returns
//! nothing. Outcomes are logged and can be queried with [`get_last_status`].
//!
//! Host arrays are checked at the boundary (null pointer with a non-zero count, misalignment,
//! unknown enum values) before anything reaches the runtime; a rejected call changes nothing.
//! Panics never cross the boundary.

pub mod boundary;

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, Ordering};

use tessera_engine::logging::{init_logging, LoggingConfig};
use tessera_engine::{
    CameraView3D, DeviceMaterial, Platform, ResourceKind, Runtime, RuntimeConfig, Status,
    SurfaceSize, WindowHandles,
};

pub use boundary::{InstancesData2D, InstancesData3D, Matrix4, MeshData2D, MeshData3D, TextureData};

/// Outcome of the most recent `create_instance`; reported for null handles.
///
/// This is the only process-wide state in the library. Hosts creating instances from several
/// threads should use [`create_instance_with_status`], which reports per call.
static CREATE_STATUS: AtomicI32 = AtomicI32::new(Status::Ok as i32);

/// Runs `f` against the instance behind `instance`, ignoring null handles and containing panics.
///
/// # Safety
/// See [`boundary::instance_mut`].
unsafe fn with_instance(instance: *mut c_void, op: &str, f: impl FnOnce(&mut Runtime)) {
    let Some(rt) = (unsafe { boundary::instance_mut(instance) }) else {
        log::warn!("{op}: null instance handle ignored");
        return;
    };
    if panic::catch_unwind(AssertUnwindSafe(|| f(rt))).is_err() {
        log::error!("{op}: panicked; call discarded");
    }
}

/// Creates an instance bound to the host window.
///
/// `handle0..2` are interpreted per platform: Windows `hwnd, hinstance`; macOS `NSView*`;
/// other unix window (or `wl_surface*`), display (or connection, `wl_display*`) and a window
/// system tag (`0` Xlib, `1` XCB, `2` Wayland). Returns null on failure.
///
/// # Safety
/// The handles must name a live window that outlives the returned instance.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn create_instance(
    handle0: u64,
    handle1: u64,
    handle2: u64,
    width: u32,
    height: u32,
    scale: f64,
) -> *mut c_void {
    let (instance, status) = create(handle0, handle1, handle2, width, height, scale);
    CREATE_STATUS.store(status as i32, Ordering::Relaxed);
    instance
}

/// Same as [`create_instance`], but also writes the outcome to `status` when non-null.
///
/// # Safety
/// As for [`create_instance`]; `status` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn create_instance_with_status(
    handle0: u64,
    handle1: u64,
    handle2: u64,
    width: u32,
    height: u32,
    scale: f64,
    status: *mut i32,
) -> *mut c_void {
    let (instance, outcome) = create(handle0, handle1, handle2, width, height, scale);
    CREATE_STATUS.store(outcome as i32, Ordering::Relaxed);
    if let Some(out) = unsafe { status.as_mut() } {
        *out = outcome as i32;
    }
    instance
}

fn create(
    handle0: u64,
    handle1: u64,
    handle2: u64,
    width: u32,
    height: u32,
    scale: f64,
) -> (*mut c_void, Status) {
    let created = panic::catch_unwind(|| {
        let handles = WindowHandles::from_triple(Platform::current(), handle0, handle1, handle2)?;
        Runtime::create(handles, SurfaceSize::new(width, height, scale), RuntimeConfig::from_env())
    });

    match created {
        Ok(Ok(runtime)) => (Box::into_raw(Box::new(runtime)).cast(), Status::Ok),
        Ok(Err(e)) => {
            log::error!("create_instance: {e}");
            (std::ptr::null_mut(), e.status())
        }
        Err(_) => {
            log::error!("create_instance: panicked");
            (std::ptr::null_mut(), Status::InitFailed)
        }
    }
}

/// Drains the GPU and frees the instance. Null is ignored.
///
/// # Safety
/// `instance` must come from [`create_instance`] and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn destroy_instance(instance: *mut c_void) {
    if instance.is_null() {
        return;
    }
    let runtime = unsafe { Box::from_raw(instance.cast::<Runtime>()) };
    if panic::catch_unwind(AssertUnwindSafe(move || runtime.destroy())).is_err() {
        log::error!("destroy_instance: panicked during teardown");
    }
}

/// # Safety
/// `instance` as for [`destroy_instance`]; `data` pointers must be valid for their counts.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_2d_mesh(instance: *mut c_void, id: u32, data: MeshData2D) {
    unsafe {
        with_instance(instance, "set_2d_mesh", |rt| match data.to_engine() {
            Ok(mesh) => {
                let _ = rt.set_2d_mesh(id, mesh);
            }
            Err(e) => rt.reject("set_2d_mesh", e),
        })
    }
}

/// # Safety
/// `instance` as for [`destroy_instance`]; `data` pointers must be valid for their counts.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_2d_instances(instance: *mut c_void, id: u32, data: InstancesData2D) {
    unsafe {
        with_instance(instance, "set_2d_instances", |rt| match data.to_engine() {
            Ok(instances) => {
                let _ = rt.set_2d_instances(id, instances);
            }
            Err(e) => rt.reject("set_2d_instances", e),
        })
    }
}

/// # Safety
/// `instance` as for [`destroy_instance`]; `data` pointers must be valid for their counts.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_3d_mesh(instance: *mut c_void, id: u32, data: MeshData3D) {
    unsafe {
        with_instance(instance, "set_3d_mesh", |rt| match data.to_engine() {
            Ok(mesh) => {
                let _ = rt.set_3d_mesh(id, mesh);
            }
            Err(e) => rt.reject("set_3d_mesh", e),
        })
    }
}

/// # Safety
/// `instance` as for [`destroy_instance`]; `ids` must point to `num` ids.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unload_3d_meshes(instance: *mut c_void, ids: *const u32, num: u32) {
    unsafe {
        with_instance(instance, "unload_3d_meshes", |rt| {
            match boundary::slice(ids, num as usize, ResourceKind::Mesh3D) {
                Ok(ids) => {
                    let _ = rt.unload_3d_meshes(ids);
                }
                Err(e) => rt.reject("unload_3d_meshes", e),
            }
        })
    }
}

/// # Safety
/// `instance` as for [`destroy_instance`]; `data` pointers must be valid for their counts.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_3d_instances(instance: *mut c_void, id: u32, data: InstancesData3D) {
    unsafe {
        with_instance(instance, "set_3d_instances", |rt| match data.to_engine() {
            Ok(instances) => {
                let _ = rt.set_3d_instances(id, instances);
            }
            Err(e) => rt.reject("set_3d_instances", e),
        })
    }
}

/// # Safety
/// `instance` as for [`destroy_instance`]; `materials` must point to `num_materials` records.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_materials(
    instance: *mut c_void,
    materials: *const DeviceMaterial,
    num_materials: u32,
) {
    unsafe {
        with_instance(instance, "set_materials", |rt| {
            match boundary::slice(materials, num_materials as usize, ResourceKind::Material) {
                Ok(materials) => {
                    let _ = rt.set_materials(materials);
                }
                Err(e) => rt.reject("set_materials", e),
            }
        })
    }
}

/// Replaces the texture array.
///
/// `changed` is a bitset of `ceil(num_textures / 32)` words; bit `i` of word `i / 32` marks
/// texture `i` for upload. Null marks every texture. Unmarked textures keep their contents
/// unless they are new.
///
/// # Safety
/// `instance` as for [`destroy_instance`]; `data` must point to `num_textures` entries whose
/// byte pointers are valid; `changed` must be null or hold the bitset words.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_textures(
    instance: *mut c_void,
    data: *const TextureData,
    num_textures: u32,
    changed: *const u32,
) {
    unsafe {
        with_instance(instance, "set_textures", |rt| {
            let decoded = boundary::slice(data, num_textures as usize, ResourceKind::Texture)
                .and_then(|raw| raw.iter().map(|t| t.to_engine()).collect::<Result<Vec<_>, _>>())
                .and_then(|textures| {
                    boundary::changed_indices(changed, num_textures).map(|c| (textures, c))
                });
            match decoded {
                Ok((textures, changed)) => {
                    let _ = rt.set_textures(&textures, &changed);
                }
                Err(e) => rt.reject("set_textures", e),
            }
        })
    }
}

/// Records and submits one frame. Blocks while every frame slot is in flight.
///
/// # Safety
/// `instance` as for [`destroy_instance`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn render(instance: *mut c_void, matrix_2d: Matrix4, view_3d: CameraView3D) {
    unsafe {
        with_instance(instance, "render", |rt| {
            let _ = rt.render(matrix_2d.cols, view_3d);
        })
    }
}

/// Blocks until every submitted frame has completed.
///
/// # Safety
/// `instance` as for [`destroy_instance`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn synchronize(instance: *mut c_void) {
    unsafe {
        with_instance(instance, "synchronize", |rt| {
            let _ = rt.synchronize();
        })
    }
}

/// # Safety
/// `instance` as for [`destroy_instance`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resize(instance: *mut c_void, width: u32, height: u32, scale_factor: f64) {
    unsafe {
        with_instance(instance, "resize", |rt| {
            let _ = rt.resize(width, height, scale_factor);
        })
    }
}

/// Status of the most recent call on `instance` (see `Status`), or of the most recent
/// `create_instance` when `instance` is null.
///
/// # Safety
/// `instance` as for [`destroy_instance`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_last_status(instance: *mut c_void) -> i32 {
    match unsafe { boundary::instance_mut(instance) } {
        Some(rt) => rt.last_status() as i32,
        None => CREATE_STATUS.load(Ordering::Relaxed),
    }
}

/// Installs the default logger (honours `RUST_LOG`). Safe to call more than once.
#[unsafe(no_mangle)]
pub extern "C" fn tessera_init_logging() {
    init_logging(LoggingConfig::default());
}
