use std::ops::Range;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::device::{RenderDevice, SurfaceSize};
use crate::resources::{
    Instances2DVersion, Instances3DVersion, MaterialsVersion, MeshVersion, TableSnapshot,
    TextureVersion,
};
use crate::scene::{CameraView3D, Mat4};

/// Passes in the order they are encoded. The overlay always composites over the scene.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassKind {
    Scene3D,
    Overlay2D,
}

pub const PASS_ORDER: [PassKind; 2] = [PassKind::Scene3D, PassKind::Overlay2D];

/// Per-frame inputs that do not live in the resource table.
#[derive(Debug, Copy, Clone)]
pub struct FrameView {
    pub matrix_2d: Mat4,
    pub camera: CameraView3D,
    pub surface: SurfaceSize,
    pub clear_color: [f64; 4],
    pub light_direction: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: Mat4,
    pub position: [f32; 4],
    /// Normalized direction towards the light; `w` unused.
    pub to_light: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct OverlayUniform {
    pub matrix: Mat4,
}

/// One material batch of a 3D draw.
pub struct Batch3D<D: RenderDevice> {
    /// Material index after clamping to the table.
    pub material: u32,
    pub instances: Range<u32>,
    pub texture: Arc<TextureVersion<D>>,
}

pub struct Draw3D<D: RenderDevice> {
    pub mesh_id: u32,
    pub mesh: Arc<MeshVersion<D>>,
    pub instances: Arc<Instances3DVersion<D>>,
    pub batches: Vec<Batch3D<D>>,
}

pub struct Draw2D<D: RenderDevice> {
    pub mesh_id: u32,
    pub mesh: Arc<MeshVersion<D>>,
    pub instances: Arc<Instances2DVersion<D>>,
    pub texture: Arc<TextureVersion<D>>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub instances_3d: u32,
    pub instances_2d: u32,
    /// Instances whose material index was past the end of the table.
    pub clamped_instances: u32,
    /// Draws or batches that referenced a texture that does not exist.
    pub fallback_textures: u32,
}

/// Everything one frame draws, fixed at record time.
///
/// The plan owns shared references to every version it reads; holding it keeps them alive
/// until the frame completes.
pub struct FramePlan<D: RenderDevice> {
    pub frame_index: u64,
    pub slot: usize,
    pub generation: u64,
    pub materials: Arc<MaterialsVersion<D>>,
    pub draws_3d: Vec<Draw3D<D>>,
    pub draws_2d: Vec<Draw2D<D>>,
    pub camera: CameraUniform,
    pub overlay: OverlayUniform,
    pub clear_color: [f64; 4],
    pub stats: PlanStats,
}

impl<D: RenderDevice> FramePlan<D> {
    pub fn build(frame_index: u64, slot: usize, snapshot: TableSnapshot<D>, view: &FrameView) -> Self {
        let mut stats = PlanStats::default();

        let material_count = snapshot.materials.meta().records.len().max(1) as u32;
        let mut draws_3d = Vec::new();
        for (&mesh_id, mesh) in &snapshot.meshes_3d {
            let Some(instances) = snapshot.instances_3d.get(&mesh_id) else { continue };
            if instances.meta().count == 0 {
                continue;
            }

            let mut batches = Vec::with_capacity(instances.meta().batches.len());
            for range in &instances.meta().batches {
                let material = range.material.min(material_count - 1);
                if material != range.material {
                    stats.clamped_instances += range.len();
                }
                let diffuse = snapshot
                    .materials
                    .meta()
                    .records
                    .get(material as usize)
                    .and_then(|m| m.diffuse_texture());
                let (texture, fallback) = snapshot.texture(diffuse);
                if fallback {
                    stats.fallback_textures += 1;
                }
                batches.push(Batch3D {
                    material,
                    instances: range.instances.clone(),
                    texture,
                });
            }

            stats.instances_3d += instances.meta().count;
            draws_3d.push(Draw3D {
                mesh_id,
                mesh: mesh.clone(),
                instances: instances.clone(),
                batches,
            });
        }

        let mut draws_2d = Vec::new();
        for (&mesh_id, mesh) in &snapshot.meshes_2d {
            let Some(instances) = snapshot.instances_2d.get(&mesh_id) else { continue };
            if instances.meta().count == 0 {
                continue;
            }
            let (texture, fallback) = snapshot.texture(mesh.meta().tex_id);
            if fallback {
                stats.fallback_textures += 1;
            }
            stats.instances_2d += instances.meta().count;
            draws_2d.push(Draw2D {
                mesh_id,
                mesh: mesh.clone(),
                instances: instances.clone(),
                texture,
            });
        }

        if stats.clamped_instances > 0 {
            log::debug!(
                "frame {frame_index}: {} instances use a clamped material index",
                stats.clamped_instances
            );
        }

        let view_proj = view.camera.view_projection(view.surface.aspect());
        let to_light = (-Vec3::from(view.light_direction)).normalize_or(Vec3::Y);
        let [px, py, pz] = view.camera.position;

        Self {
            frame_index,
            slot,
            generation: snapshot.generation,
            materials: snapshot.materials,
            draws_3d,
            draws_2d,
            camera: CameraUniform {
                view_proj: view_proj.to_cols_array(),
                position: [px, py, pz, 1.0],
                to_light: to_light.extend(0.0).to_array(),
            },
            overlay: OverlayUniform {
                matrix: view.matrix_2d,
            },
            clear_color: view.clear_color,
            stats,
        }
    }

    pub fn passes(&self) -> [PassKind; 2] {
        PASS_ORDER
    }

    pub fn is_empty(&self) -> bool {
        self.draws_3d.is_empty() && self.draws_2d.is_empty()
    }
}
