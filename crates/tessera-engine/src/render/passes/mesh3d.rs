use crate::render::{CameraUniform, FramePlan, RenderCtx, RenderTarget};
use crate::scene::{Instance3D, Vertex3D};
use crate::device::WgpuDevice;

use super::common::{BindLayouts, DEPTH_FORMAT, SlotUniforms, opaque_blend, triangle_list};

/// Depth-tested, lit, instanced mesh pass. Clears color and depth.
pub struct Mesh3dPass {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    camera: SlotUniforms,
}

impl Mesh3dPass {
    pub fn new(device: &wgpu::Device, layouts: &BindLayouts, slots: usize) -> Self {
        Self {
            pipeline_format: None,
            pipeline: None,
            camera: SlotUniforms::new::<CameraUniform>(device, &layouts.camera, slots, "tessera camera"),
        }
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, slot: usize, camera: &CameraUniform) {
        self.camera.write(queue, slot, camera);
    }

    pub fn encode(
        &mut self,
        ctx: &RenderCtx<'_>,
        layouts: &BindLayouts,
        target: &mut RenderTarget<'_>,
        plan: &FramePlan<WgpuDevice>,
    ) {
        self.ensure_pipeline(ctx, layouts);

        let [r, g, b, a] = plan.clear_color;
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessera 3d pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if plan.draws_3d.is_empty() {
            return;
        }
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(camera) = self.camera.bind_group(plan.slot) else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, camera, &[]);
        rpass.set_bind_group(1, &plan.materials.gpu().bind_group, &[]);

        for draw in &plan.draws_3d {
            let mesh = draw.mesh.gpu();
            rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
            rpass.set_vertex_buffer(1, draw.instances.gpu().buffer.slice(..));
            if let Some(ib) = &mesh.indices {
                rpass.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint32);
            }

            for batch in &draw.batches {
                rpass.set_bind_group(2, &batch.texture.gpu().bind_group, &[]);
                if mesh.indices.is_some() {
                    rpass.draw_indexed(0..mesh.element_count, 0, batch.instances.clone());
                } else {
                    rpass.draw(0..mesh.element_count, batch.instances.clone());
                }
            }
        }
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, layouts: &BindLayouts) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tessera mesh3d shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh3d.wgsl").into()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tessera mesh3d pipeline layout"),
            bind_group_layouts: &[&layouts.camera, &layouts.materials, &layouts.texture],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tessera mesh3d pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex3D::layout(), Instance3D::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(opaque_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: triangle_list(),

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!("mesh3d pipeline built for {:?}", ctx.surface_format);
        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }
}
