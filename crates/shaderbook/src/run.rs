use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use bus::{CompileEvent, NotificationBus};
use catalog::{Catalog, Example};
use renderer::{
    BuildStrategy, CompileOutcome, CompilePipeline, PipelineInput, PreviewConfig, PreviewWindow,
    ValidatedShaderBuilder,
};
use session::SessionCoordinator;
use shaderconfig::{CompileMode, ShaderbookConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::Workspace;
use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::state::AppState;
use crate::watcher::SourceWatcher;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let mut workspace = Workspace::load(AppPaths::discover()?)?;
    let catalog = workspace.catalog();
    let title = initial_example(&args, &workspace.state, &catalog)?;
    let preview_config = preview_config(&args, &workspace.config);
    info!(
        example = %title,
        size = ?preview_config.surface_size,
        fps = ?preview_config.target_fps,
        strategy = ?preview_config.build_strategy,
        "starting preview"
    );

    let bus = NotificationBus::new();
    let input = PipelineInput::new();
    let mut session = SessionCoordinator::new(catalog, workspace.resolver(), input.clone(), &bus);
    session.select(&title);

    let window = PreviewWindow::spawn(preview_config, input, bus)?;
    window.set_title(window_title(&title, false))?;

    let watcher = session
        .selected_example()
        .and_then(Example::backing)
        .and_then(|path| match SourceWatcher::new(path) {
            Ok(watcher) => {
                info!(path = %path.display(), "edit this file to update the preview");
                Some(watcher)
            }
            Err(err) => {
                warn!("live editing disabled: {err:#}");
                None
            }
        });

    let autosave = workspace.config.autosave;
    let mut last_save = Instant::now();
    while window.is_running() {
        for event in session.apply_compile_events() {
            report_event(&window, &event);
            if args.json_events {
                print_event(&event);
            }
        }

        match &watcher {
            Some(watcher) => {
                if watcher.wait_for_change(POLL_INTERVAL)? {
                    reload_from_disk(&mut session, watcher.target());
                }
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }

        if let Some(interval) = autosave {
            if last_save.elapsed() >= interval {
                let written = session.persist_dirty();
                if written > 0 {
                    debug!(count = written, "autosaved accepted sources");
                }
                last_save = Instant::now();
            }
        }
    }

    session.apply_compile_events();
    let written = session.persist_dirty();
    if written > 0 {
        info!(count = written, "saved accepted sources");
    }
    let unsaved: Vec<&str> = session.dirty().collect();
    if !unsaved.is_empty() {
        warn!(examples = ?unsaved, "some accepted sources could not be saved");
    }

    workspace.state.last_example = session.selected().map(str::to_string);
    if let Err(err) = workspace.save_state() {
        warn!("failed to save session state: {err:#}");
    }
    window.shutdown()
}

fn initial_example(args: &RunArgs, state: &AppState, catalog: &Catalog) -> Result<String> {
    if let Some(title) = &args.example {
        if catalog.find_example(title).is_none() {
            bail!("no example titled '{title}'; run `shaderbook list` to see the catalog");
        }
        return Ok(title.clone());
    }

    if let Some(title) = &state.last_example {
        if catalog.find_example(title).is_some() {
            return Ok(title.clone());
        }
        debug!(example = %title, "last example no longer in catalog");
    }

    catalog
        .first_example()
        .map(|example| example.title().to_string())
        .ok_or_else(|| anyhow!("the catalog has no examples to preview"))
}

/// Command-line flags win over `config.toml`; an explicit `--fps 0` uncaps.
fn preview_config(args: &RunArgs, config: &ShaderbookConfig) -> PreviewConfig {
    let defaults = PreviewConfig::default();
    let target_fps = match args.fps {
        Some(fps) => (fps > 0.0).then_some(fps),
        None => config.target_fps(),
    };
    let build_strategy =
        if args.inline_compile || config.preview.compile == CompileMode::Inline {
            BuildStrategy::Inline
        } else {
            BuildStrategy::Threaded
        };

    PreviewConfig {
        surface_size: args
            .size
            .or(config.preview.size)
            .unwrap_or(defaults.surface_size),
        target_fps,
        build_strategy,
        ..defaults
    }
}

fn window_title(example: &str, failed: bool) -> String {
    if failed {
        format!("shaderbook: {example} (compile error)")
    } else {
        format!("shaderbook: {example}")
    }
}

fn report_event(window: &PreviewWindow, event: &CompileEvent) {
    match event {
        CompileEvent::SourceAccepted { example, .. } => {
            info!(example = %example, "shader compiled");
        }
        CompileEvent::CompileFailed { example, message } => {
            warn!(example = %example, "compile failed:\n{message}");
        }
    }
    if let Err(err) = window.set_title(window_title(event.example(), event.is_failure())) {
        debug!("could not update window title: {err:#}");
    }
}

fn print_event(event: &CompileEvent) {
    match event_line(event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!("failed to encode compile event: {err:#}"),
    }
}

fn event_line(event: &CompileEvent) -> Result<String> {
    serde_json::to_string(event).context("failed to serialize compile event")
}

fn reload_from_disk(session: &mut SessionCoordinator, path: &Path) {
    match fs::read_to_string(path) {
        Ok(text) if text != session.editor_text() => {
            session.edit(text);
        }
        Ok(_) => debug!(path = %path.display(), "file unchanged; ignoring event"),
        Err(err) => warn!(path = %path.display(), "failed to read edited shader: {err}"),
    }
}

/// Compiles `title` without a window. Returns the compiler's message on failure.
pub fn check_example(catalog: &Catalog, title: &str) -> Result<Option<String>> {
    let example = catalog
        .find_example(title)
        .ok_or_else(|| anyhow!("no example titled '{title}'"))?;

    let input = PipelineInput::new();
    let mut pipeline =
        CompilePipeline::with_strategy(ValidatedShaderBuilder, input.clone(), BuildStrategy::Inline);
    input.submit(title, example.source());

    match pipeline.poll().context("compile pipeline produced no result")? {
        CompileOutcome::Accepted { .. } => Ok(None),
        CompileOutcome::Failed { message, .. } => Ok(Some(message)),
    }
}
