//! Latest-wins compile pipeline.
//!
//! The coordinator side holds a [`PipelineInput`] and submits `(binding,
//! source)` pairs whenever the selection changes or the user edits. The frame
//! side owns the [`CompilePipeline`] and calls [`CompilePipeline::poll`] once per
//! tick. A poll snapshots the newest submission, builds it inline or on a
//! worker thread, and applies only the result whose generation matches the
//! newest dispatched submission; anything older is discarded on arrival.
//!
//! The current program is only ever replaced by a successful build, so a failed
//! edit keeps the last good preview on screen.
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use bus::CompileEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::compile::CompileError;

/// Turns fragment source text into something the frame sink can draw with.
pub trait ProgramBuilder: Send + Sync + 'static {
    type Program: Send + Sync + 'static;

    fn build(&self, source: &str) -> Result<Self::Program, CompileError>;
}

/// Where builds run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildStrategy {
    /// Build on the polling thread before the frame is drawn.
    #[default]
    Inline,
    /// Build on a short-lived worker thread; the result lands on a later poll.
    Threaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Compiling,
    Ready,
    Failed,
}

/// One complete source string together with the example it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSubmission {
    pub binding: String,
    pub source: String,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct PendingSlot {
    latest: Option<SourceSubmission>,
    generation: u64,
}

/// Cloneable handle used to feed source into a [`CompilePipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    slot: Arc<Mutex<PendingSlot>>,
}

impl PipelineInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the pending source wholesale and returns its generation.
    pub fn submit(&self, binding: impl Into<String>, source: impl Into<String>) -> u64 {
        let mut slot = self.lock();
        slot.generation += 1;
        let generation = slot.generation;
        slot.latest = Some(SourceSubmission {
            binding: binding.into(),
            source: source.into(),
            generation,
        });
        generation
    }

    /// The newest submission, whether or not it has been compiled yet.
    pub fn pending(&self) -> Option<SourceSubmission> {
        self.lock().latest.clone()
    }

    pub fn pending_source(&self) -> Option<String> {
        self.lock().latest.as_ref().map(|pending| pending.source.clone())
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn newer_than(&self, generation: u64) -> Option<SourceSubmission> {
        self.lock()
            .latest
            .as_ref()
            .filter(|pending| pending.generation > generation)
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, PendingSlot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Result of applying a finished build, tagged with the submission's binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Accepted { binding: String, source: String },
    Failed { binding: String, message: String },
}

impl From<CompileOutcome> for CompileEvent {
    fn from(outcome: CompileOutcome) -> Self {
        match outcome {
            CompileOutcome::Accepted { binding, source } => CompileEvent::SourceAccepted {
                example: binding,
                source,
            },
            CompileOutcome::Failed { binding, message } => CompileEvent::CompileFailed {
                example: binding,
                message,
            },
        }
    }
}

struct BuildResult<P> {
    submission: SourceSubmission,
    result: Result<P, CompileError>,
}

pub struct CompilePipeline<B: ProgramBuilder> {
    builder: Arc<B>,
    input: PipelineInput,
    strategy: BuildStrategy,
    state: PipelineState,
    current: Option<Arc<B::Program>>,
    current_source: Option<String>,
    last_error: Option<String>,
    dispatched: u64,
    results_tx: Sender<BuildResult<B::Program>>,
    results_rx: Receiver<BuildResult<B::Program>>,
}

impl<B: ProgramBuilder> CompilePipeline<B> {
    pub fn new(builder: B, input: PipelineInput) -> Self {
        Self::with_strategy(builder, input, BuildStrategy::default())
    }

    pub fn with_strategy(builder: B, input: PipelineInput, strategy: BuildStrategy) -> Self {
        let (results_tx, results_rx) = unbounded();
        Self {
            builder: Arc::new(builder),
            input,
            strategy,
            state: PipelineState::Idle,
            current: None,
            current_source: None,
            last_error: None,
            dispatched: 0,
            results_tx,
            results_rx,
        }
    }

    /// Dispatches the newest submission if it has not been dispatched yet,
    /// then applies any finished build for it.
    ///
    /// Returns the outcome when this poll moved the pipeline into `Ready` or
    /// `Failed`.
    pub fn poll(&mut self) -> Option<CompileOutcome> {
        if let Some(submission) = self.input.newer_than(self.dispatched) {
            self.dispatched = submission.generation;
            self.state = PipelineState::Compiling;
            self.dispatch(submission);
        }

        let mut outcome = None;
        while let Ok(finished) = self.results_rx.try_recv() {
            if finished.submission.generation != self.dispatched {
                debug!(
                    example = %finished.submission.binding,
                    generation = finished.submission.generation,
                    latest = self.dispatched,
                    "discarding superseded shader build"
                );
                continue;
            }
            outcome = Some(self.apply(finished));
        }
        outcome
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn strategy(&self) -> BuildStrategy {
        self.strategy
    }

    pub fn current(&self) -> Option<&B::Program> {
        self.current.as_deref()
    }

    pub fn current_handle(&self) -> Option<Arc<B::Program>> {
        self.current.clone()
    }

    /// Source the current program was built from.
    pub fn current_source(&self) -> Option<&str> {
        self.current_source.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn input(&self) -> &PipelineInput {
        &self.input
    }

    fn dispatch(&self, submission: SourceSubmission) {
        match self.strategy {
            BuildStrategy::Inline => self.build_inline(submission),
            BuildStrategy::Threaded => {
                let builder = Arc::clone(&self.builder);
                let results = self.results_tx.clone();
                let fallback = submission.clone();
                let spawned = thread::Builder::new()
                    .name("shaderbook-compile".into())
                    .spawn(move || {
                        let result = builder.build(&submission.source);
                        let _ = results.send(BuildResult { submission, result });
                    });
                if let Err(err) = spawned {
                    warn!(error = %err, "failed to spawn compile thread; building inline");
                    self.build_inline(fallback);
                }
            }
        }
    }

    fn build_inline(&self, submission: SourceSubmission) {
        let result = self.builder.build(&submission.source);
        let _ = self.results_tx.send(BuildResult { submission, result });
    }

    fn apply(&mut self, finished: BuildResult<B::Program>) -> CompileOutcome {
        let BuildResult { submission, result } = finished;
        match result {
            Ok(program) => {
                let previous = self.current.replace(Arc::new(program));
                drop(previous);
                self.current_source = Some(submission.source.clone());
                self.last_error = None;
                self.state = PipelineState::Ready;
                debug!(
                    example = %submission.binding,
                    generation = submission.generation,
                    "compiled shader"
                );
                CompileOutcome::Accepted {
                    binding: submission.binding,
                    source: submission.source,
                }
            }
            Err(err) => {
                let message = err.to_string();
                self.last_error = Some(message.clone());
                self.state = PipelineState::Failed;
                warn!(
                    example = %submission.binding,
                    generation = submission.generation,
                    "shader compile failed; keeping previous program"
                );
                CompileOutcome::Failed {
                    binding: submission.binding,
                    message,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use super::*;

    /// Accepts any source without "error"; the program is the source itself.
    struct EchoBuilder;

    impl ProgramBuilder for EchoBuilder {
        type Program = String;

        fn build(&self, source: &str) -> Result<String, CompileError> {
            if source.contains("error") {
                Err(CompileError::Parse(format!("bad source: {source}")))
            } else {
                Ok(source.to_string())
            }
        }
    }

    /// Blocks builds of "slow" until released, then reports completion.
    struct GatedBuilder {
        release: Mutex<mpsc::Receiver<()>>,
        finished: Mutex<mpsc::Sender<()>>,
    }

    impl ProgramBuilder for GatedBuilder {
        type Program = String;

        fn build(&self, source: &str) -> Result<String, CompileError> {
            if source == "slow" {
                let _ = self.release.lock().unwrap().recv();
                let _ = self.finished.lock().unwrap().send(());
            }
            Ok(source.to_string())
        }
    }

    fn poll_until_outcome<B: ProgramBuilder>(pipeline: &mut CompilePipeline<B>) -> CompileOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = pipeline.poll() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "no compile outcome before deadline");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn idle_until_first_submission() {
        let mut pipeline = CompilePipeline::new(EchoBuilder, PipelineInput::new());
        assert!(pipeline.poll().is_none());
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.current().is_none());
    }

    #[test]
    fn inline_success_replaces_program() {
        let input = PipelineInput::new();
        let mut pipeline = CompilePipeline::new(EchoBuilder, input.clone());

        input.submit("Line", "v1");
        let outcome = pipeline.poll();
        assert_eq!(
            outcome,
            Some(CompileOutcome::Accepted {
                binding: "Line".into(),
                source: "v1".into()
            })
        );
        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert_eq!(pipeline.current().map(String::as_str), Some("v1"));
        assert_eq!(pipeline.current_source(), Some("v1"));

        assert!(pipeline.poll().is_none(), "no new submission, no new outcome");
    }

    #[test]
    fn failure_keeps_last_good_program() {
        let input = PipelineInput::new();
        let mut pipeline = CompilePipeline::new(EchoBuilder, input.clone());

        input.submit("Line", "v1");
        pipeline.poll();
        let before = pipeline.current_handle().unwrap();

        input.submit("Line", "error here");
        let outcome = pipeline.poll().unwrap();
        assert!(matches!(outcome, CompileOutcome::Failed { ref binding, .. } if binding == "Line"));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(Arc::ptr_eq(&before, &pipeline.current_handle().unwrap()));
        assert_eq!(pipeline.current_source(), Some("v1"));
        assert!(pipeline.last_error().unwrap().contains("error here"));
    }

    #[test]
    fn only_latest_submission_is_compiled() {
        let input = PipelineInput::new();
        let mut pipeline = CompilePipeline::new(EchoBuilder, input.clone());

        input.submit("A", "first");
        input.submit("A", "second");
        assert_eq!(input.generation(), 2);
        assert_eq!(input.pending_source().as_deref(), Some("second"));

        let outcome = pipeline.poll().unwrap();
        assert_eq!(
            outcome,
            CompileOutcome::Accepted {
                binding: "A".into(),
                source: "second".into()
            }
        );
    }

    #[test]
    fn resubmitting_identical_source_recompiles() {
        let input = PipelineInput::new();
        let mut pipeline = CompilePipeline::new(EchoBuilder, input.clone());

        input.submit("A", "same");
        assert!(pipeline.poll().is_some());
        input.submit("A", "same");
        assert!(pipeline.poll().is_some());
    }

    #[test]
    fn threaded_stale_result_never_replaces_newer_outcome() {
        let (release_tx, release_rx) = mpsc::channel();
        let (finished_tx, finished_rx) = mpsc::channel();
        let builder = GatedBuilder {
            release: Mutex::new(release_rx),
            finished: Mutex::new(finished_tx),
        };
        let input = PipelineInput::new();
        let mut pipeline =
            CompilePipeline::with_strategy(builder, input.clone(), BuildStrategy::Threaded);

        input.submit("A", "slow");
        assert!(pipeline.poll().is_none());
        assert_eq!(pipeline.state(), PipelineState::Compiling);

        input.submit("B", "fast");
        let outcome = poll_until_outcome(&mut pipeline);
        assert_eq!(
            outcome,
            CompileOutcome::Accepted {
                binding: "B".into(),
                source: "fast".into()
            }
        );

        release_tx.send(()).unwrap();
        finished_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("slow build finished");
        thread::sleep(Duration::from_millis(50));

        assert!(pipeline.poll().is_none());
        assert_eq!(pipeline.current().map(String::as_str), Some("fast"));
        assert_eq!(pipeline.state(), PipelineState::Ready);
    }

    #[test]
    fn outcome_converts_to_bus_event() {
        let event: CompileEvent = CompileOutcome::Failed {
            binding: "Step".into(),
            message: "oops".into(),
        }
        .into();
        assert_eq!(
            event,
            CompileEvent::CompileFailed {
                example: "Step".into(),
                message: "oops".into()
            }
        );
    }
}
