use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use bus::{CompileEvent, NotificationBus, Subscription};
use catalog::{persist_source, Catalog, Example, SourceResolver};
use renderer::PipelineInput;
use tracing::{debug, info, warn};

/// Binds selection and edits to the catalog and the compile pipeline.
///
/// The coordinator is the catalog's only writer. It never compiles anything
/// itself: sources go into the pipeline's pending slot and come back as bus
/// events, which [`SessionCoordinator::apply_compile_events`] folds into the
/// catalog.
pub struct SessionCoordinator {
    catalog: Catalog,
    resolver: SourceResolver,
    pipeline: PipelineInput,
    events: Subscription,
    selected: Option<String>,
    editor_text: String,
    feedback: Option<String>,
    dirty: BTreeSet<String>,
}

impl SessionCoordinator {
    pub fn new(
        catalog: Catalog,
        resolver: SourceResolver,
        pipeline: PipelineInput,
        bus: &NotificationBus,
    ) -> Self {
        Self {
            catalog,
            resolver,
            pipeline,
            events: bus.subscribe(),
            selected: None,
            editor_text: String::new(),
            feedback: None,
            dirty: BTreeSet::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pipeline(&self) -> &PipelineInput {
        &self.pipeline
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_example(&self) -> Option<&Example> {
        self.catalog.find_example(self.selected.as_deref()?)
    }

    /// Text currently shown in the editing surface.
    pub fn editor_text(&self) -> &str {
        &self.editor_text
    }

    /// Latest compile error for the selected example, cleared by a success.
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Makes `title` the single selected example and schedules its stored
    /// source for compilation. Unknown titles leave the selection untouched.
    pub fn select(&mut self, title: &str) -> bool {
        let Some(example) = self.catalog.find_example(title) else {
            warn!(example = %title, "cannot select unknown example");
            return false;
        };

        let source = example.source().to_string();
        self.feedback = example.compile_error().map(str::to_string);
        self.editor_text.clone_from(&source);
        self.pipeline.submit(title, source);
        self.selected = Some(title.to_string());
        info!(example = %title, "selected example");
        true
    }

    /// Forwards raw editor text to the pipeline, bound to the selection.
    ///
    /// A newer edit supersedes any accepted source still waiting to be
    /// written back. Acceptances of older text that arrive afterwards update
    /// the catalog but are not written back.
    pub fn edit(&mut self, text: impl Into<String>) -> bool {
        let Some(title) = self.selected.as_deref() else {
            warn!("ignoring edit with no example selected");
            return false;
        };

        let text = text.into();
        let generation = self.pipeline.submit(title, text.clone());
        debug!(example = %title, generation, bytes = text.len(), "forwarded edit");
        self.dirty.remove(title);
        self.editor_text = text;
        true
    }

    pub fn add_section(&mut self, title: &str) -> bool {
        self.catalog.add_section(title)
    }

    /// Adds the shader at `path` to `section`, creating both when missing.
    ///
    /// The example is titled after the file stem. A missing file is created
    /// empty and contributes empty source.
    pub fn add_from_file(&mut self, section: &str, path: &Path) -> Result<String> {
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| anyhow!("cannot derive an example title from {}", path.display()))?;

        if self.catalog.find_example(&title).is_some() {
            bail!("an example titled '{title}' already exists");
        }

        let resolved = self.resolver.read_or_create(path);
        self.catalog.add_section(section);
        self.catalog
            .add_example(section, Example::from_resolved(title.clone(), resolved));
        info!(example = %title, section, path = %path.display(), "added example");
        Ok(title)
    }

    /// Removes the first example titled `title`; clears the selection if it
    /// pointed there.
    pub fn remove(&mut self, title: &str) -> Option<Example> {
        let removed = self.catalog.remove_example(title)?;
        self.dirty.remove(title);
        if self.selected.as_deref() == Some(title) {
            self.selected = None;
            self.editor_text.clear();
            self.feedback = None;
        }
        info!(example = %title, "removed example");
        Some(removed)
    }

    /// Drains pending compile events into the catalog, in publish order.
    pub fn apply_compile_events(&mut self) -> Vec<CompileEvent> {
        let events = self.events.drain();
        for event in &events {
            let is_selected = self.selected.as_deref() == Some(event.example());
            match event {
                CompileEvent::SourceAccepted { example, source } => {
                    let unchanged = self
                        .catalog
                        .find_example(example)
                        .is_some_and(|stored| stored.source() == source);
                    let superseded = is_selected && *source != self.editor_text;
                    if self.catalog.update_source(example, source.as_str())
                        && !unchanged
                        && !superseded
                    {
                        self.dirty.insert(example.clone());
                    }
                    if is_selected {
                        self.feedback = None;
                    }
                }
                CompileEvent::CompileFailed { example, message } => {
                    self.catalog.update_compile_error(example, message.as_str());
                    if is_selected {
                        self.feedback = Some(message.clone());
                    }
                }
            }
        }
        events
    }

    /// Titles whose accepted source has not been written back yet.
    pub fn dirty(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Writes the example's current source to its backing file. Returns
    /// `false` when the example has nowhere to persist to.
    pub fn persist(&mut self, title: &str) -> Result<bool> {
        let example = self
            .catalog
            .find_example(title)
            .ok_or_else(|| anyhow!("unknown example '{title}'"))?;
        let Some(path) = example.backing() else {
            warn!(example = %title, "example has no backing file; not persisting");
            return Ok(false);
        };

        persist_source(path, example.source())
            .with_context(|| format!("failed to persist example '{title}'"))?;
        self.dirty.remove(title);
        debug!(example = %title, path = %path.display(), "persisted example");
        Ok(true)
    }

    /// Persists every dirty example, returning how many were written.
    ///
    /// A failed write is logged and the example stays dirty for the next
    /// attempt; the remaining examples are still written.
    pub fn persist_dirty(&mut self) -> usize {
        let titles: Vec<String> = self.dirty.iter().cloned().collect();
        let mut written = 0;
        for title in titles {
            match self.persist(&title) {
                Ok(true) => written += 1,
                Ok(false) => {
                    self.dirty.remove(&title);
                }
                Err(err) => warn!(example = %title, "{err:#}"),
            }
        }
        written
    }
}
