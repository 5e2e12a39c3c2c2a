use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::source::ResolvedSource;

/// One named fragment shader in the catalog.
///
/// The title doubles as the example's identity. `source_ref` is the reference
/// the source was resolved from (a bundled name or a file path) and `backing`
/// is where edits get written back, when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    title: String,
    source_ref: String,
    backing: Option<PathBuf>,
    source: String,
    compile_error: Option<String>,
}

impl Example {
    pub fn new(title: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_ref: source_ref.into(),
            backing: None,
            source: String::new(),
            compile_error: None,
        }
    }

    /// Builds an example whose source has already been resolved.
    pub fn from_resolved(title: impl Into<String>, resolved: ResolvedSource) -> Self {
        Self {
            title: title.into(),
            source_ref: resolved.reference,
            backing: resolved.backing,
            source: resolved.text,
            compile_error: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_backing(mut self, path: impl Into<PathBuf>) -> Self {
        self.backing = Some(path.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn backing(&self) -> Option<&Path> {
        self.backing.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compile_error(&self) -> Option<&str> {
        self.compile_error.as_deref()
    }

    pub(crate) fn set_source(&mut self, source: String) {
        self.source = source;
        self.compile_error = None;
    }

    pub(crate) fn set_compile_error(&mut self, message: String) {
        self.compile_error = Some(message);
    }
}

/// Named, insertion-ordered group of examples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    title: String,
    examples: Vec<Example>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            examples: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub(crate) fn push(&mut self, example: Example) {
        self.examples.push(example);
    }

    pub(crate) fn position(&self, title: &str) -> Option<usize> {
        self.examples
            .iter()
            .position(|example| example.title == title)
    }

    pub(crate) fn remove(&mut self, index: usize) -> Example {
        self.examples.remove(index)
    }

    pub(crate) fn example_mut(&mut self, index: usize) -> &mut Example {
        &mut self.examples[index]
    }
}
