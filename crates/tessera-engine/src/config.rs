//! Runtime configuration.

use std::time::Duration;

use crate::device::GpuInit;

/// Upper bound on the frame-slot pool.
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;

/// GPU power preference requested from the adapter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PowerPreference {
    #[default]
    High,
    Low,
}

/// Instance-wide configuration, fixed at creation.
///
/// Every field has a sensible default; [`RuntimeConfig::from_env`] layers
/// `TESSERA_*` environment overrides on top so embedding hosts need no code changes
/// to tune buffering or vsync.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of frame slots. Clamped to `1..=MAX_FRAMES_IN_FLIGHT`.
    pub frames_in_flight: usize,

    /// FIFO presentation when `true`, otherwise the lowest-latency supported mode.
    pub vsync: bool,

    /// Prefer an sRGB swapchain format when available.
    pub prefer_srgb: bool,

    pub power_preference: PowerPreference,

    /// Linear RGBA the 3D pass clears to.
    pub clear_color: [f64; 4],

    /// Direction the fixed scene light travels (world space, need not be normalized).
    pub light_direction: [f32; 3],

    /// Longest a single frame may take on the GPU before the device is considered lost.
    pub frame_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            vsync: true,
            prefer_srgb: true,
            power_preference: PowerPreference::High,
            clear_color: [0.02, 0.02, 0.03, 1.0],
            light_direction: [-0.3, -1.0, -0.5],
            frame_timeout: Duration::from_millis(5000),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `TESSERA_FRAMES_IN_FLIGHT`, `TESSERA_VSYNC`, `TESSERA_POWER`
    /// and `TESSERA_FRAME_TIMEOUT_MS`. Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("TESSERA_FRAMES_IN_FLIGHT") {
            match v.trim().parse::<usize>() {
                Ok(n) => self.frames_in_flight = n,
                Err(_) => log::warn!("ignoring TESSERA_FRAMES_IN_FLIGHT={v:?}"),
            }
        }
        if let Some(v) = lookup("TESSERA_VSYNC") {
            match parse_bool(&v) {
                Some(b) => self.vsync = b,
                None => log::warn!("ignoring TESSERA_VSYNC={v:?}"),
            }
        }
        if let Some(v) = lookup("TESSERA_POWER") {
            match v.trim().to_ascii_lowercase().as_str() {
                "high" => self.power_preference = PowerPreference::High,
                "low" => self.power_preference = PowerPreference::Low,
                _ => log::warn!("ignoring TESSERA_POWER={v:?}"),
            }
        }
        if let Some(v) = lookup("TESSERA_FRAME_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.frame_timeout = Duration::from_millis(ms),
                _ => log::warn!("ignoring TESSERA_FRAME_TIMEOUT_MS={v:?}"),
            }
        }
        self
    }

    /// Slot count after clamping.
    pub fn slot_count(&self) -> usize {
        self.frames_in_flight.clamp(1, MAX_FRAMES_IN_FLIGHT)
    }

    /// wgpu-level settings derived from this configuration.
    pub fn gpu_init(&self) -> GpuInit {
        GpuInit {
            prefer_srgb: self.prefer_srgb,
            present_mode: if self.vsync {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            power_preference: match self.power_preference {
                PowerPreference::High => wgpu::PowerPreference::HighPerformance,
                PowerPreference::Low => wgpu::PowerPreference::LowPower,
            },
            frame_timeout: self.frame_timeout,
            ..GpuInit::default()
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
