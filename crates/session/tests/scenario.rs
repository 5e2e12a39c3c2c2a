use std::convert::Infallible;
use std::fs;

use bus::{CompileEvent, NotificationBus};
use catalog::{Catalog, SourceResolver};
use renderer::{
    CompilePipeline, CompiledFragment, FixedTimeSource, FrameSink, PipelineInput, PipelineState,
    PreviewRenderer, PreviewUniforms, TimeSource, ValidatedShaderBuilder,
};
use session::SessionCoordinator;

struct NullSink;

impl FrameSink<CompiledFragment> for NullSink {
    type Error = Infallible;

    fn size(&self) -> (u32, u32) {
        (64, 64)
    }

    fn draw(
        &mut self,
        _program: Option<&CompiledFragment>,
        _uniforms: &PreviewUniforms,
    ) -> Result<(), Infallible> {
        Ok(())
    }
}

struct Harness {
    session: SessionCoordinator,
    preview: PreviewRenderer<ValidatedShaderBuilder, NullSink>,
    clock: FixedTimeSource,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SourceResolver::new(dir.path().join("shaders"));
        let catalog = Catalog::seeded(&resolver);
        let bus = NotificationBus::new();
        let input = PipelineInput::new();

        let session = SessionCoordinator::new(catalog, resolver, input.clone(), &bus);
        let pipeline = CompilePipeline::new(ValidatedShaderBuilder, input);
        let preview = PreviewRenderer::new(pipeline, NullSink, bus);

        Self {
            session,
            preview,
            clock: FixedTimeSource::new(1.0 / 60.0),
            _dir: dir,
        }
    }

    fn frame(&mut self) -> Vec<CompileEvent> {
        let sample = self.clock.sample();
        self.preview.tick(sample, [0.0, 0.0]).unwrap();
        self.session.apply_compile_events()
    }
}

#[test]
fn solid_color_edit_cycle() {
    let mut h = Harness::new();
    let stored = h
        .session
        .catalog()
        .find_example("Solid Color")
        .unwrap()
        .source()
        .to_string();

    assert!(h.session.select("Solid Color"));
    assert_eq!(h.session.pipeline().pending_source().as_deref(), Some(stored.as_str()));

    h.session.edit("void main() { gl_FragColor = vec4(1.0) ");
    let events = h.frame();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_failure());
    assert_eq!(h.preview.pipeline().state(), PipelineState::Failed);
    assert!(h.preview.pipeline().current().is_none());
    assert!(!h.session.feedback().unwrap_or_default().is_empty());
    let example = h.session.catalog().find_example("Solid Color").unwrap();
    assert_eq!(example.source(), stored, "failed edits never reach the catalog");
    assert!(example.compile_error().is_some());

    let valid = "void main() { gl_FragColor = vec4(0.0, 1.0, 0.0, 1.0); }";
    h.session.edit(valid);
    let events = h.frame();
    assert_eq!(
        events,
        vec![CompileEvent::SourceAccepted {
            example: "Solid Color".into(),
            source: valid.into()
        }]
    );
    assert_eq!(h.preview.pipeline().state(), PipelineState::Ready);
    assert!(h.preview.pipeline().current().is_some());
    assert!(h.session.feedback().is_none());
    let example = h.session.catalog().find_example("Solid Color").unwrap();
    assert_eq!(example.source(), valid);
    assert!(example.compile_error().is_none());
}

#[test]
fn switching_selection_mid_edit_compiles_new_example() {
    let mut h = Harness::new();
    h.session.select("Line");
    h.session.edit("broken");
    h.session.select("Step");

    let events = h.frame();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].example(), "Step");
    assert!(!events[0].is_failure());
    assert_eq!(h.session.catalog().find_example("Line").unwrap().compile_error(), None);
}

#[test]
fn every_seeded_example_compiles_on_selection() {
    let mut h = Harness::new();
    let titles: Vec<String> = h
        .session
        .catalog()
        .example_titles()
        .into_iter()
        .map(str::to_string)
        .collect();

    for title in titles {
        h.session.select(&title);
        let events = h.frame();
        assert_eq!(events.len(), 1, "{title}");
        assert!(!events[0].is_failure(), "{title}: {events:?}");
    }
}

#[test]
fn removing_only_example_leaves_empty_section() {
    let mut h = Harness::new();
    h.session.select("Solid Color");

    let removed = h.session.remove("Solid Color").unwrap();
    assert_eq!(removed.title(), "Solid Color");
    assert!(h.session.selected().is_none());
    assert!(h.session.catalog().section("Hello World").unwrap().is_empty());
    assert!(!h.session.edit("void main() {}"));
}

#[test]
fn add_from_missing_file_creates_it() {
    let mut h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waves.frag");

    let title = h.session.add_from_file("Sketches", &path).unwrap();
    assert_eq!(title, "waves");
    assert!(path.is_file());
    assert_eq!(
        h.session.catalog().find_example("waves").unwrap().source(),
        ""
    );

    h.session.select("waves");
    let events = h.frame();
    assert!(events[0].is_failure(), "empty source has no main");
}

#[test]
fn accepted_sources_persist_to_backing_file() {
    let mut h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glow.frag");
    fs::write(&path, "void main() { gl_FragColor = vec4(0.5); }").unwrap();

    h.session.add_from_file("Sketches", &path).unwrap();
    h.session.select("glow");
    let edited = "void main() { gl_FragColor = vec4(u_time); }";
    h.session.edit(edited);
    h.frame();

    assert_eq!(h.session.persist_dirty(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), edited);
    assert_eq!(h.session.dirty().count(), 0);
}
