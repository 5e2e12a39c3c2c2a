//! wgpu side of the preview.
//!
//! - `context` owns instance/device/surface wiring and reconfigures the
//!   swapchain when the window resizes.
//! - `program` turns validated fragment modules into render pipelines and
//!   implements `ProgramBuilder` for the live preview.
//! - `sink` implements `FrameSink` by drawing the current pipeline (or a
//!   cleared frame) into the swapchain.

mod context;
mod program;
mod sink;

pub(crate) use context::GpuContext;
pub(crate) use program::ProgramLayouts;
pub use program::{GpuProgramBuilder, ShaderProgram};
pub use sink::SurfaceSink;
