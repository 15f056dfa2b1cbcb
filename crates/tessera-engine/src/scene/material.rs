use bytemuck::{Pod, Zeroable};

/// Material record as laid out in the GPU material table.
///
/// `parameters` packs sixteen 8-bit scalars, four per lane, least significant byte first.
/// Map indices refer to the texture set; `-1` means no map.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DeviceMaterial {
    pub color: [f32; 4],
    pub absorption: [f32; 4],
    pub specular: [f32; 4],
    pub parameters: [u32; 4],
    pub flags: u32,
    pub diffuse_map: i32,
    pub normal_map: i32,
    pub metallic_roughness_map: i32,
    pub emissive_map: i32,
    pub sheen_map: i32,
    pub _dummy: [i32; 2],
}

impl Default for DeviceMaterial {
    fn default() -> Self {
        Self {
            color: [0.0; 4],
            absorption: [0.0; 4],
            specular: [0.0; 4],
            parameters: [0; 4],
            flags: 0,
            diffuse_map: -1,
            normal_map: -1,
            metallic_roughness_map: -1,
            emissive_map: -1,
            sheen_map: -1,
            _dummy: [0; 2],
        }
    }
}

macro_rules! packed_param {
    ($($name:ident => ($lane:expr, $shift:expr)),* $(,)?) => {
        $(
            pub fn $name(&self) -> f32 {
                unpack(self.parameters[$lane], $shift)
            }
        )*
    };
}

fn unpack(lane: u32, shift: u32) -> f32 {
    ((lane >> shift) & 0xff) as f32 / 255.0
}

impl DeviceMaterial {
    /// Flat-colored material with every map unset.
    pub fn with_color(color: [f32; 4]) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Material the runtime draws with while the host has uploaded none.
    pub(crate) fn fallback() -> Self {
        Self::with_color([0.8, 0.8, 0.8, 1.0])
    }

    /// Packs a parameter byte (`value` in `0.0..=1.0`) into its lane.
    pub fn set_param(&mut self, lane: usize, slot: u32, value: f32) {
        let shift = slot * 8;
        let byte = (value.clamp(0.0, 1.0) * 255.0).round() as u32;
        self.parameters[lane] = (self.parameters[lane] & !(0xff << shift)) | (byte << shift);
    }

    /// Diffuse map index if set.
    pub fn diffuse_texture(&self) -> Option<u32> {
        u32::try_from(self.diffuse_map).ok()
    }

    packed_param! {
        metallic => (0, 0),
        subsurface => (0, 8),
        specular_f => (0, 16),
        roughness => (0, 24),
        specular_tint => (1, 0),
        anisotropic => (1, 8),
        sheen => (1, 16),
        sheen_tint => (1, 24),
        clearcoat => (2, 0),
        clearcoat_gloss => (2, 8),
        transmission => (2, 16),
        eta => (2, 24),
        custom0 => (3, 0),
        custom1 => (3, 8),
        custom2 => (3, 16),
        custom3 => (3, 24),
    }
}
