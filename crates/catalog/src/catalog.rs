//! In-memory store behind the example library.
//!
//! Every lookup is a linear scan over sections and examples. The catalog is
//! bounded to a few dozen entries, and all access goes through [`Catalog`], so
//! an id-indexed map can replace the scan without touching callers.
//!
//! Types:
//!
//! - `Catalog` owns the ordered sections and exposes the CRUD operations used
//!   by the session coordinator.
//!
//! Functions:
//!
//! - `Catalog::add_section` / `add_example` grow the catalog, silently
//!   ignoring duplicate section titles and unknown target sections.
//! - `Catalog::remove_example` drops the first example with a given title.
//! - `Catalog::update_source` / `update_compile_error` apply compile feedback
//!   in place.
use serde::Serialize;
use tracing::debug;

use crate::example::{Example, Section};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    sections: Vec<Section>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty section. Returns `false` without touching the catalog
    /// when a section with the same title already exists.
    pub fn add_section(&mut self, title: impl Into<String>) -> bool {
        let title = title.into();
        if self.section(&title).is_some() {
            debug!(section = %title, "section already present; ignoring add");
            return false;
        }
        self.sections.push(Section::new(title));
        true
    }

    /// Appends `example` to the named section. Returns `false` when the
    /// section does not exist. Example titles are not de-duplicated here.
    pub fn add_example(&mut self, section_title: &str, example: Example) -> bool {
        match self
            .sections
            .iter_mut()
            .find(|section| section.title() == section_title)
        {
            Some(section) => {
                section.push(example);
                true
            }
            None => {
                debug!(
                    section = %section_title,
                    example = %example.title(),
                    "target section missing; ignoring add"
                );
                false
            }
        }
    }

    /// Removes the first example titled `title`, scanning sections in order.
    /// The owning section stays in place even when it becomes empty.
    pub fn remove_example(&mut self, title: &str) -> Option<Example> {
        let (section, index) = self.locate(title)?;
        Some(self.sections[section].remove(index))
    }

    pub fn find_example(&self, title: &str) -> Option<&Example> {
        self.sections
            .iter()
            .flat_map(|section| section.examples())
            .find(|example| example.title() == title)
    }

    /// Replaces the stored source of the first example titled `title` and
    /// clears its compile error. Returns `false` if no such example exists.
    pub fn update_source(&mut self, title: &str, source: impl Into<String>) -> bool {
        match self.find_example_mut(title) {
            Some(example) => {
                example.set_source(source.into());
                true
            }
            None => false,
        }
    }

    pub fn update_compile_error(&mut self, title: &str, message: impl Into<String>) -> bool {
        match self.find_example_mut(title) {
            Some(example) => {
                example.set_compile_error(message.into());
                true
            }
            None => false,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.title() == title)
    }

    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(Section::title).collect()
    }

    /// Every example title in catalog order, duplicates included.
    pub fn example_titles(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|section| section.examples())
            .map(Example::title)
            .collect()
    }

    pub fn first_example(&self) -> Option<&Example> {
        self.sections
            .iter()
            .find_map(|section| section.examples().first())
    }

    pub fn len(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.examples().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find_example_mut(&mut self, title: &str) -> Option<&mut Example> {
        let (section, index) = self.locate(title)?;
        Some(self.sections[section].example_mut(index))
    }

    fn locate(&self, title: &str) -> Option<(usize, usize)> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(section, entries)| entries.position(title).map(|index| (section, index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(title: &str, source: &str) -> Example {
        Example::new(title, title).with_source(source)
    }

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_section("Hello World");
        catalog.add_section("Shaping Functions");
        catalog.add_example("Hello World", example("Solid Color", "solid"));
        catalog.add_example("Shaping Functions", example("Line", "line"));
        catalog.add_example("Shaping Functions", example("Step", "step"));
        catalog
    }

    #[test]
    fn add_section_ignores_duplicate_titles() {
        let mut once = Catalog::new();
        assert!(once.add_section("Colors"));

        let mut twice = Catalog::new();
        assert!(twice.add_section("Colors"));
        assert!(!twice.add_section("Colors"));

        assert_eq!(once, twice);
        assert_eq!(twice.section_titles(), vec!["Colors"]);
    }

    #[test]
    fn section_titles_stay_unique_across_mixed_adds() {
        let mut catalog = Catalog::new();
        for title in ["A", "B", "A", "C", "B", "A"] {
            catalog.add_section(title);
        }
        assert_eq!(catalog.section_titles(), vec!["A", "B", "C"]);
    }

    #[test]
    fn add_section_keeps_existing_examples() {
        let mut catalog = sample();
        catalog.add_section("Hello World");
        let section = catalog.section("Hello World").unwrap();
        assert_eq!(section.examples().len(), 1);
    }

    #[test]
    fn add_example_to_unknown_section_is_noop() {
        let mut catalog = sample();
        let before = catalog.clone();
        assert!(!catalog.add_example("Missing", example("Orphan", "")));
        assert_eq!(catalog, before);
    }

    #[test]
    fn remove_example_drops_first_match_only() {
        let mut catalog = sample();
        catalog.add_example("Hello World", example("Step", "duplicate"));

        let removed = catalog.remove_example("Step").expect("removed");
        assert_eq!(removed.source(), "duplicate");
        assert_eq!(
            catalog.example_titles(),
            vec!["Solid Color", "Line", "Step"]
        );
        assert_eq!(catalog.find_example("Step").unwrap().source(), "step");
    }

    #[test]
    fn remove_last_example_keeps_section() {
        let mut catalog = sample();
        assert!(catalog.remove_example("Solid Color").is_some());

        let section = catalog.section("Hello World").expect("section kept");
        assert!(section.is_empty());
        assert_eq!(catalog.sections().len(), 2);
    }

    #[test]
    fn remove_unknown_example_is_noop() {
        let mut catalog = sample();
        let before = catalog.clone();
        assert!(catalog.remove_example("Voronoi").is_none());
        assert_eq!(catalog, before);
    }

    #[test]
    fn find_example_returns_first_match() {
        let mut catalog = sample();
        catalog.add_section("Later");
        catalog.add_example("Later", example("Line", "shadowed"));
        assert_eq!(catalog.find_example("Line").unwrap().source(), "line");
        assert!(catalog.find_example("Nope").is_none());
    }

    #[test]
    fn update_source_clears_previous_error() {
        let mut catalog = sample();
        assert!(catalog.update_compile_error("Line", "syntax error"));
        assert_eq!(
            catalog.find_example("Line").unwrap().compile_error(),
            Some("syntax error")
        );

        assert!(catalog.update_source("Line", "fixed"));
        let line = catalog.find_example("Line").unwrap();
        assert_eq!(line.source(), "fixed");
        assert!(line.compile_error().is_none());
    }

    #[test]
    fn updates_for_missing_examples_report_false() {
        let mut catalog = sample();
        assert!(!catalog.update_source("Missing", "x"));
        assert!(!catalog.update_compile_error("Missing", "x"));
    }

    #[test]
    fn first_example_skips_empty_sections() {
        let mut catalog = Catalog::new();
        catalog.add_section("Empty");
        catalog.add_section("Full");
        catalog.add_example("Full", example("Only", ""));
        assert_eq!(catalog.first_example().unwrap().title(), "Only");
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_empty());
    }
}
