/// Texel layout of host texture data. Both are 4 bytes per texel.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum TextureFormat {
    #[default]
    Bgra8 = 0,
    Rgba8 = 1,
}

impl TextureFormat {
    pub const BYTES_PER_TEXEL: usize = 4;

    pub(crate) fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::Bgra8 => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

/// Host texture with all mip levels packed back to back, largest first.
#[derive(Debug, Copy, Clone)]
pub struct TextureData<'a> {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub bytes: &'a [u8],
    pub format: TextureFormat,
}

impl TextureData<'_> {
    pub fn mip_level_width_height(&self, level: u32) -> (u32, u32) {
        let w = self.width.checked_shr(level).unwrap_or(0).max(1);
        let h = self.height.checked_shr(level).unwrap_or(0).max(1);
        (w, h)
    }

    /// Byte offset of `level` within `bytes`.
    pub fn offset_for_level(&self, level: u32) -> usize {
        (0..level)
            .map(|l| {
                let (w, h) = self.mip_level_width_height(l);
                w as usize * h as usize * TextureFormat::BYTES_PER_TEXEL
            })
            .sum()
    }

    /// Bytes a complete mip chain of `mip_levels` levels requires.
    pub fn required_len(&self) -> usize {
        self.offset_for_level(self.mip_levels)
    }

    pub(crate) fn level_bytes(&self, level: u32) -> &[u8] {
        let (w, h) = self.mip_level_width_height(level);
        let start = self.offset_for_level(level);
        let len = w as usize * h as usize * TextureFormat::BYTES_PER_TEXEL;
        &self.bytes[start..start + len]
    }

    /// Why the data cannot be uploaded, if it can't.
    pub(crate) fn problem(&self) -> Option<String> {
        if self.width == 0 || self.height == 0 {
            return Some(format!("zero-sized texture {}x{}", self.width, self.height));
        }
        if self.mip_levels == 0 {
            return Some("mip_levels must be at least 1".to_string());
        }
        let full_chain = 32 - self.width.max(self.height).leading_zeros();
        if self.mip_levels > full_chain {
            return Some(format!(
                "{} mip levels requested, {}x{} supports {}",
                self.mip_levels, self.width, self.height, full_chain
            ));
        }
        let need = self.required_len();
        if self.bytes.len() < need {
            return Some(format!(
                "{} bytes supplied, {} needed for {} level(s)",
                self.bytes.len(),
                need,
                self.mip_levels
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex(width: u32, height: u32, mip_levels: u32, bytes: &[u8]) -> TextureData<'_> {
        TextureData {
            width,
            height,
            mip_levels,
            bytes,
            format: TextureFormat::Rgba8,
        }
    }

    #[test]
    fn mip_offsets_are_packed() {
        let t = tex(4, 2, 3, &[]);
        assert_eq!(t.mip_level_width_height(0), (4, 2));
        assert_eq!(t.mip_level_width_height(1), (2, 1));
        assert_eq!(t.mip_level_width_height(2), (1, 1));
        assert_eq!(t.offset_for_level(1), 32);
        assert_eq!(t.offset_for_level(2), 40);
        assert_eq!(t.required_len(), 44);
    }

    #[test]
    fn validation_catches_short_and_degenerate_data() {
        let bytes = [0u8; 16];
        assert!(tex(2, 2, 1, &bytes).problem().is_none());
        assert!(tex(2, 2, 2, &bytes).problem().is_some());
        assert!(tex(0, 2, 1, &bytes).problem().is_some());
        assert!(tex(2, 2, 0, &bytes).problem().is_some());
        assert!(tex(2, 2, 3, &[0u8; 64]).problem().is_some());
    }

    #[test]
    fn level_bytes_slices_the_chain() {
        let mut bytes = vec![0u8; 20];
        bytes[16..].copy_from_slice(&[9, 9, 9, 9]);
        let t = tex(2, 2, 2, &bytes);
        assert_eq!(t.level_bytes(1), &[9, 9, 9, 9]);
    }
}
