//! GPU resource types and bind group layouts shared by both passes.

use std::num::NonZeroU64;

use crate::scene::DeviceMaterial;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ── blend ─────────────────────────────────────────────────────────────────

/// Depth-tested meshes overwrite the target; material alpha never reaches the swapchain.
pub(super) fn opaque_blend() -> wgpu::BlendState {
    wgpu::BlendState::REPLACE
}

/// Straight-alpha blending; host colors are not premultiplied.
pub(super) fn overlay_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

pub(super) fn min_binding_size<T>() -> Option<NonZeroU64> {
    NonZeroU64::new(std::mem::size_of::<T>() as u64)
}

pub(super) fn triangle_list() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

// ── uploaded resources ────────────────────────────────────────────────────

pub struct GpuMesh {
    pub(crate) vertices: wgpu::Buffer,
    pub(crate) indices: Option<wgpu::Buffer>,
    pub(crate) element_count: u32,
}

impl GpuMesh {
    pub(crate) fn destroy(self) {
        self.vertices.destroy();
        if let Some(ib) = self.indices {
            ib.destroy();
        }
    }
}

pub struct GpuInstances {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) count: u32,
}

pub struct GpuMaterials {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

pub struct GpuTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) bind_group: wgpu::BindGroup,
}

// ── layouts ───────────────────────────────────────────────────────────────

/// Bind group layouts that uploaded resources are created against.
///
/// Group usage:
/// - 3D pass: 0 = camera (per slot), 1 = materials, 2 = diffuse texture
/// - 2D pass: 0 = overlay matrix (per slot), 1 = texture
pub struct BindLayouts {
    pub(crate) camera: wgpu::BindGroupLayout,
    pub(crate) overlay: wgpu::BindGroupLayout,
    pub(crate) materials: wgpu::BindGroupLayout,
    pub(crate) texture: wgpu::BindGroupLayout,
    pub(crate) sampler: wgpu::Sampler,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera camera bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: min_binding_size::<crate::render::CameraUniform>(),
                },
                count: None,
            }],
        });

        let overlay = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera overlay bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: min_binding_size::<crate::render::OverlayUniform>(),
                },
                count: None,
            }],
        });

        let materials = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera materials bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: min_binding_size::<DeviceMaterial>(),
                },
                count: None,
            }],
        });

        let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessera texture sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            camera,
            overlay,
            materials,
            texture,
            sampler,
        }
    }
}

/// One uniform buffer + bind group per frame slot.
pub(super) struct SlotUniforms {
    buffers: Vec<(wgpu::Buffer, wgpu::BindGroup)>,
}

impl SlotUniforms {
    pub(super) fn new<T>(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        slots: usize,
        label: &str,
    ) -> Self {
        let buffers = (0..slots)
            .map(|slot| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{label} ubo {slot}")),
                    size: std::mem::size_of::<T>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{label} bind group {slot}")),
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                (buffer, bind_group)
            })
            .collect();
        Self { buffers }
    }

    pub(super) fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, slot: usize, value: &T) {
        if let Some((buffer, _)) = self.buffers.get(slot) {
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(value));
        }
    }

    pub(super) fn bind_group(&self, slot: usize) -> Option<&wgpu::BindGroup> {
        self.buffers.get(slot).map(|(_, bg)| bg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_blend_ignores_source_alpha() {
        let blend = opaque_blend();
        for component in [blend.color, blend.alpha] {
            assert_eq!(component.src_factor, wgpu::BlendFactor::One);
            assert_eq!(component.dst_factor, wgpu::BlendFactor::Zero);
        }
    }

    #[test]
    fn overlay_blend_mixes_with_the_3d_image() {
        let blend = overlay_blend();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }
}
