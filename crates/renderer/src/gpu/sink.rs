use winit::dpi::PhysicalSize;

use crate::preview::FrameSink;
use crate::uniforms::PreviewUniforms;

use super::context::GpuContext;
use super::program::{ProgramLayouts, ShaderProgram};

/// Dark grey shown while no program has compiled yet.
const NEUTRAL_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.08,
    b: 0.08,
    a: 1.0,
};

/// Presents frames to the preview window's swapchain.
pub struct SurfaceSink {
    context: GpuContext,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl SurfaceSink {
    pub(crate) fn new(context: GpuContext, layouts: &ProgramLayouts) -> Self {
        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("preview uniforms"),
            size: std::mem::size_of::<PreviewUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("preview uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        Self {
            context,
            uniform_buffer,
            uniform_bind_group,
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    pub fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn context(&self) -> &GpuContext {
        &self.context
    }
}

impl FrameSink<ShaderProgram> for SurfaceSink {
    type Error = wgpu::SurfaceError;

    fn size(&self) -> (u32, u32) {
        (self.context.size.width, self.context.size.height)
    }

    fn draw(
        &mut self,
        program: Option<&ShaderProgram>,
        uniforms: &PreviewUniforms,
    ) -> Result<(), Self::Error> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, uniforms.as_bytes());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("preview encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("preview pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(NEUTRAL_CLEAR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let Some(program) = program {
                render_pass.set_pipeline(&program.pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
