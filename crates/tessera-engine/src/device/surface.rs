//! Surface resolution.
//!
//! Turns the host's platform handle triple plus size/scale into a [`SurfaceDescriptor`],
//! and holds the wgpu helpers that pick a format/alpha mode and react to surface errors.

use std::ffi::c_void;
use std::num::{NonZeroIsize, NonZeroU32};
use std::ptr::NonNull;

use raw_window_handle::{
    AppKitDisplayHandle, AppKitWindowHandle, RawDisplayHandle, RawWindowHandle,
    WaylandDisplayHandle, WaylandWindowHandle, Win32WindowHandle, WindowsDisplayHandle,
    XcbDisplayHandle, XcbWindowHandle, XlibDisplayHandle, XlibWindowHandle,
};

use super::SurfaceErrorAction;
use crate::error::{Result, RuntimeError};

/// Tag values carried in `h2` on non-Apple unix.
pub const XLIB_HANDLE: u64 = 0;
pub const XCB_HANDLE: u64 = 1;
pub const WAYLAND_HANDLE: u64 = 2;

/// Windowing platform the handle triple is interpreted for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Platform {
    Windows,
    MacOs,
    Unix,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }
}

/// Native window handles, resolved once at instance creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowHandles {
    Win32 { hwnd: NonZeroIsize, hinstance: Option<NonZeroIsize> },
    Xlib { window: u64, display: NonNull<c_void> },
    Xcb { window: NonZeroU32, connection: NonNull<c_void> },
    Wayland { surface: NonNull<c_void>, display: NonNull<c_void> },
    AppKit { ns_view: NonNull<c_void> },
}

// SAFETY: the variants only carry opaque native handles. They are never dereferenced
// here; the graphics backend that receives them does its own thread affinity checks.
unsafe impl Send for WindowHandles {}
unsafe impl Sync for WindowHandles {}

fn non_null(raw: u64, what: &str) -> Result<NonNull<c_void>> {
    NonNull::new(raw as usize as *mut c_void)
        .ok_or_else(|| RuntimeError::SurfaceInvalid(format!("{what} handle is null")))
}

impl WindowHandles {
    /// Decodes the C handle triple for `platform`.
    ///
    /// Windows: `h0 = HWND`, `h1 = HINSTANCE`. macOS: `h0 = NSView*`.
    /// Other unix: `h2` selects Xlib/XCB/Wayland, `h0` is the window or `wl_surface*`,
    /// `h1` the display, connection or `wl_display*`.
    pub fn from_triple(platform: Platform, h0: u64, h1: u64, h2: u64) -> Result<Self> {
        match platform {
            Platform::Windows => {
                let hwnd = NonZeroIsize::new(h0 as isize)
                    .ok_or_else(|| RuntimeError::SurfaceInvalid("HWND is null".into()))?;
                Ok(WindowHandles::Win32 {
                    hwnd,
                    hinstance: NonZeroIsize::new(h1 as isize),
                })
            }
            Platform::MacOs => Ok(WindowHandles::AppKit {
                ns_view: non_null(h0, "NSView")?,
            }),
            Platform::Unix => match h2 {
                XLIB_HANDLE => {
                    if h0 == 0 {
                        return Err(RuntimeError::SurfaceInvalid("Xlib window is 0".into()));
                    }
                    Ok(WindowHandles::Xlib {
                        window: h0,
                        display: non_null(h1, "Xlib display")?,
                    })
                }
                XCB_HANDLE => {
                    let window = u32::try_from(h0)
                        .ok()
                        .and_then(NonZeroU32::new)
                        .ok_or_else(|| {
                            RuntimeError::SurfaceInvalid(format!("bad XCB window id {h0}"))
                        })?;
                    Ok(WindowHandles::Xcb {
                        window,
                        connection: non_null(h1, "XCB connection")?,
                    })
                }
                WAYLAND_HANDLE => Ok(WindowHandles::Wayland {
                    surface: non_null(h0, "wl_surface")?,
                    display: non_null(h1, "wl_display")?,
                }),
                other => Err(RuntimeError::SurfaceInvalid(format!(
                    "unknown window system tag {other}"
                ))),
            },
        }
    }

    /// `raw-window-handle` form consumed by the graphics backend.
    pub fn to_raw(&self) -> (RawWindowHandle, RawDisplayHandle) {
        match *self {
            WindowHandles::Win32 { hwnd, hinstance } => {
                let mut handle = Win32WindowHandle::new(hwnd);
                handle.hinstance = hinstance;
                (handle.into(), WindowsDisplayHandle::new().into())
            }
            WindowHandles::Xlib { window, display } => (
                XlibWindowHandle::new(window as _).into(),
                XlibDisplayHandle::new(Some(display), 0).into(),
            ),
            WindowHandles::Xcb { window, connection } => (
                XcbWindowHandle::new(window).into(),
                XcbDisplayHandle::new(Some(connection), 0).into(),
            ),
            WindowHandles::Wayland { surface, display } => (
                WaylandWindowHandle::new(surface).into(),
                WaylandDisplayHandle::new(display).into(),
            ),
            WindowHandles::AppKit { ns_view } => (
                AppKitWindowHandle::new(ns_view).into(),
                AppKitDisplayHandle::new().into(),
            ),
        }
    }
}

/// Drawable size in physical pixels plus the host's DPI scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32, scale: f64) -> Self {
        Self { width, height, scale }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RuntimeError::SurfaceInvalid(format!(
                "degenerate surface {}x{}",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(RuntimeError::SurfaceInvalid(format!(
                "invalid scale factor {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// The size to switch to, or `None` if `next` matches the current one.
    pub fn resized_to(&self, next: SurfaceSize) -> Result<Option<SurfaceSize>> {
        next.validate()?;
        Ok((next != *self).then_some(next))
    }

    pub fn logical_size(&self) -> (f64, f64) {
        (
            self.width as f64 / self.scale,
            self.height as f64 / self.scale,
        )
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Resolved surface parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceDescriptor {
    pub handles: WindowHandles,
    pub size: SurfaceSize,
    /// Frames the swapchain may queue; equals the slot count.
    pub buffering: u32,
}

impl SurfaceDescriptor {
    pub fn resolve(handles: WindowHandles, size: SurfaceSize, frames_in_flight: usize) -> Result<Self> {
        size.validate()?;
        Ok(Self {
            handles,
            size,
            buffering: frames_in_flight.max(1) as u32,
        })
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn surface_error_action(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── handle triple ─────────────────────────────────────────────────────

    #[test]
    fn windows_triple_needs_hwnd() {
        let h = WindowHandles::from_triple(Platform::Windows, 0x1234, 0x10, 0).unwrap();
        assert!(matches!(h, WindowHandles::Win32 { hinstance: Some(_), .. }));
        let err = WindowHandles::from_triple(Platform::Windows, 0, 0x10, 0).unwrap_err();
        assert!(matches!(err, RuntimeError::SurfaceInvalid(_)));
    }

    #[test]
    fn unix_tag_selects_window_system() {
        let xlib = WindowHandles::from_triple(Platform::Unix, 42, 0x1000, XLIB_HANDLE).unwrap();
        assert!(matches!(xlib, WindowHandles::Xlib { window: 42, .. }));
        let xcb = WindowHandles::from_triple(Platform::Unix, 7, 0x1000, XCB_HANDLE).unwrap();
        assert!(matches!(xcb, WindowHandles::Xcb { .. }));
        let wl = WindowHandles::from_triple(Platform::Unix, 0x2000, 0x1000, WAYLAND_HANDLE).unwrap();
        assert!(matches!(wl, WindowHandles::Wayland { .. }));
    }

    #[test]
    fn unix_rejects_unknown_tag_and_null_display() {
        assert!(WindowHandles::from_triple(Platform::Unix, 1, 1, 9).is_err());
        assert!(WindowHandles::from_triple(Platform::Unix, 1, 0, XLIB_HANDLE).is_err());
        assert!(WindowHandles::from_triple(Platform::Unix, 1 << 40, 1, XCB_HANDLE).is_err());
    }

    #[test]
    fn raw_handles_match_variant() {
        let h = WindowHandles::from_triple(Platform::Unix, 0x2000, 0x1000, WAYLAND_HANDLE).unwrap();
        let (w, d) = h.to_raw();
        assert!(matches!(w, RawWindowHandle::Wayland(_)));
        assert!(matches!(d, RawDisplayHandle::Wayland(_)));
    }

    // ── size ──────────────────────────────────────────────────────────────

    #[test]
    fn size_validation() {
        assert!(SurfaceSize::new(800, 600, 1.0).validate().is_ok());
        assert!(SurfaceSize::new(0, 600, 1.0).validate().is_err());
        assert!(SurfaceSize::new(800, 600, 0.0).validate().is_err());
        assert!(SurfaceSize::new(800, 600, f64::NAN).validate().is_err());
    }

    #[test]
    fn logical_size_divides_by_scale() {
        let s = SurfaceSize::new(1600, 1200, 2.0);
        assert_eq!(s.logical_size(), (800.0, 600.0));
        assert!((s.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn resize_is_noop_when_unchanged() {
        let h = WindowHandles::from_triple(Platform::MacOs, 0x10, 0, 0).unwrap();
        let desc = SurfaceDescriptor::resolve(h, SurfaceSize::new(640, 480, 1.0), 2).unwrap();
        assert_eq!(desc.buffering, 2);
        let size = desc.size;
        assert!(size.resized_to(SurfaceSize::new(640, 480, 1.0)).unwrap().is_none());
        let next = size.resized_to(SurfaceSize::new(800, 480, 1.0)).unwrap().unwrap();
        assert_eq!(next.width, 800);
        assert!(size.resized_to(SurfaceSize::new(0, 480, 1.0)).is_err());
        assert!(size.resized_to(SurfaceSize::new(640, 480, f64::NAN)).is_err());
    }
}
