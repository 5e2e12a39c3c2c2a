use std::borrow::Cow;

use tracing::debug;
use wgpu::naga::ShaderStage;

use crate::compile::{compile_fragment, vertex_shader_source, CompileError};
use crate::pipeline::ProgramBuilder;

/// Layout objects shared by every program and by the sink that binds uniforms.
#[derive(Clone)]
pub(crate) struct ProgramLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl ProgramLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("preview uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("preview pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fullscreen triangle vertex"),
            source: wgpu::ShaderSource::Glsl {
                shader: vertex_shader_source(),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });

        Self {
            uniform_layout,
            pipeline_layout,
            vertex_module,
        }
    }
}

/// A render pipeline built from one accepted fragment source.
pub struct ShaderProgram {
    pub(crate) pipeline: wgpu::RenderPipeline,
}

/// Builds wgpu render pipelines from fragment source.
///
/// naga validation runs first so syntax errors carry readable diagnostics;
/// anything wgpu still rejects is caught through a validation error scope,
/// which keeps a bad shader from reaching the device's uncaptured-error panic.
pub struct GpuProgramBuilder {
    device: wgpu::Device,
    layouts: ProgramLayouts,
    surface_format: wgpu::TextureFormat,
}

impl GpuProgramBuilder {
    pub(crate) fn new(
        device: wgpu::Device,
        layouts: ProgramLayouts,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            layouts,
            surface_format,
        }
    }
}

impl ProgramBuilder for GpuProgramBuilder {
    type Program = ShaderProgram;

    fn build(&self, source: &str) -> Result<ShaderProgram, CompileError> {
        let compiled = compile_fragment(source)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let fragment_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("shaderbook fragment"),
                source: wgpu::ShaderSource::Naga(Cow::Owned(compiled.module)),
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("shaderbook pipeline"),
                layout: Some(&self.layouts.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.layouts.vertex_module,
                    entry_point: Some("main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(CompileError::Pipeline(err.to_string()));
        }

        debug!("created render pipeline");
        Ok(ShaderProgram { pipeline })
    }
}
