//! Renderer crate for shaderbook.
//!
//! Turns fragment-shader source into pixels and reports how each attempt went.
//! The flow for a single frame is:
//!
//! ```text
//!   PipelineInput::submit ──▶ CompilePipeline::poll ──▶ ProgramBuilder::build
//!                                     │                       (inline / thread)
//!                                     ▼
//!   PreviewRenderer::tick ──▶ NotificationBus::publish (one event per outcome)
//!            │
//!            └─▶ FrameSink::draw(current program or neutral frame)
//! ```
//!
//! `window` hosts the loop inside a winit event loop with the wgpu-backed
//! [`GpuProgramBuilder`] and [`SurfaceSink`]; tests and `shaderbook check` drive
//! it headlessly with [`ValidatedShaderBuilder`].

pub mod compile;
pub mod gpu;
pub mod pipeline;
pub mod preview;
pub mod runtime;
pub mod types;
pub mod uniforms;
mod window;

pub use compile::{compile_fragment, wrap_fragment, CompileError, CompiledFragment, ValidatedShaderBuilder};
pub use gpu::{GpuProgramBuilder, ShaderProgram, SurfaceSink};
pub use pipeline::{
    BuildStrategy, CompileOutcome, CompilePipeline, PipelineInput, PipelineState, ProgramBuilder,
    SourceSubmission,
};
pub use preview::{FrameReport, FrameSink, PreviewRenderer};
pub use runtime::{
    FixedTimeSource, FrameScheduler, SystemTimeSource, TimeSample, TimeSource,
};
pub use types::{AdapterProfile, GpuPowerPreference, PreviewConfig};
pub use uniforms::PreviewUniforms;
pub use window::PreviewWindow;
