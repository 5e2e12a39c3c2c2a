//! Per-frame driver tying the compile pipeline to a draw target.
//!
//! [`PreviewRenderer::tick`] is the whole frame timeline: poll the pipeline,
//! publish at most one compile event, refresh uniforms, draw. The draw target
//! is a [`FrameSink`], so the loop runs the same against the wgpu surface and
//! against a recording sink in tests.
use bus::{CompileEvent, NotificationBus};

use crate::pipeline::{CompileOutcome, CompilePipeline, PipelineState, ProgramBuilder};
use crate::runtime::TimeSample;
use crate::uniforms::PreviewUniforms;

/// A surface frames are drawn into.
pub trait FrameSink<P> {
    type Error;

    /// Current drawable size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Draws one frame. `None` means there is no program yet and the sink
    /// should present a neutral cleared frame.
    fn draw(&mut self, program: Option<&P>, uniforms: &PreviewUniforms) -> Result<(), Self::Error>;
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub state: PipelineState,
    pub drew_program: bool,
    pub outcome: Option<CompileOutcome>,
    /// Subscribers that received the tick's compile event.
    pub delivered: usize,
}

pub struct PreviewRenderer<B, S>
where
    B: ProgramBuilder,
    S: FrameSink<B::Program>,
{
    pipeline: CompilePipeline<B>,
    sink: S,
    bus: NotificationBus,
    uniforms: PreviewUniforms,
}

impl<B, S> PreviewRenderer<B, S>
where
    B: ProgramBuilder,
    S: FrameSink<B::Program>,
{
    pub fn new(pipeline: CompilePipeline<B>, sink: S, bus: NotificationBus) -> Self {
        let (width, height) = sink.size();
        Self {
            pipeline,
            sink,
            bus,
            uniforms: PreviewUniforms::new(width, height),
        }
    }

    pub fn tick(&mut self, sample: TimeSample, mouse: [f32; 2]) -> Result<FrameReport, S::Error> {
        let outcome = self.pipeline.poll();
        let delivered = match &outcome {
            Some(outcome) => self.bus.publish(CompileEvent::from(outcome.clone())),
            None => 0,
        };

        let (width, height) = self.sink.size();
        self.uniforms.set_resolution(width, height);
        self.uniforms.set_mouse(mouse);
        self.uniforms.apply_sample(sample);

        let program = self.pipeline.current();
        self.sink.draw(program, &self.uniforms)?;

        Ok(FrameReport {
            state: self.pipeline.state(),
            drew_program: program.is_some(),
            outcome,
            delivered,
        })
    }

    pub fn pipeline(&self) -> &CompilePipeline<B> {
        &self.pipeline
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn uniforms(&self) -> &PreviewUniforms {
        &self.uniforms
    }
}
