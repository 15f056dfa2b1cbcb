use crate::device::WgpuDevice;
use crate::render::{FramePlan, OverlayUniform, RenderCtx, RenderTarget};
use crate::scene::{Instance2D, Vertex2D};

use super::common::{BindLayouts, DEPTH_FORMAT, SlotUniforms, overlay_blend, triangle_list};

/// Alpha-blended overlay pass drawn over the 3D scene.
///
/// Depth is cleared first; instances are ordered by their per-instance depth.
pub struct Mesh2dPass {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    overlay: SlotUniforms,
}

impl Mesh2dPass {
    pub fn new(device: &wgpu::Device, layouts: &BindLayouts, slots: usize) -> Self {
        Self {
            pipeline_format: None,
            pipeline: None,
            overlay: SlotUniforms::new::<OverlayUniform>(device, &layouts.overlay, slots, "tessera overlay"),
        }
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, slot: usize, overlay: &OverlayUniform) {
        self.overlay.write(queue, slot, overlay);
    }

    pub fn encode(
        &mut self,
        ctx: &RenderCtx<'_>,
        layouts: &BindLayouts,
        target: &mut RenderTarget<'_>,
        plan: &FramePlan<WgpuDevice>,
    ) {
        if plan.draws_2d.is_empty() {
            return;
        }
        self.ensure_pipeline(ctx, layouts);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(overlay) = self.overlay.bind_group(plan.slot) else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessera 2d pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, overlay, &[]);

        for draw in &plan.draws_2d {
            let mesh = draw.mesh.gpu();
            let instances = draw.instances.gpu();
            rpass.set_bind_group(1, &draw.texture.gpu().bind_group, &[]);
            rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
            rpass.set_vertex_buffer(1, instances.buffer.slice(..));
            rpass.draw(0..mesh.element_count, 0..instances.count);
        }
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, layouts: &BindLayouts) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tessera mesh2d shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh2d.wgsl").into()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tessera mesh2d pipeline layout"),
            bind_group_layouts: &[&layouts.overlay, &layouts.texture],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tessera mesh2d pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex2D::layout(), Instance2D::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(overlay_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: triangle_list(),

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!("mesh2d pipeline built for {:?}", ctx.surface_format);
        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }
}
