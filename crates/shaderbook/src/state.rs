use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Catalog edits made through the CLI, remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub last_example: Option<String>,
    /// Titles removed from the built-in or configured catalog.
    pub removed: Vec<String>,
    /// Sections created through the CLI; they outlive their examples.
    pub sections: Vec<String>,
    pub user_examples: Vec<UserExample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserExample {
    pub section: String,
    pub path: PathBuf,
}

impl UserExample {
    pub fn title(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
    }
}

impl AppState {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read state file at {}", path.display()))?;
            let state: Self = toml::from_str(&contents)
                .with_context(|| format!("failed to parse state file at {}", path.display()))?;
            Ok(state)
        } else {
            Ok(Self::default())
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("state path has no parent: {}", path.display()))?;
        fs::create_dir_all(dir).with_context(|| {
            format!(
                "failed to prepare directory for state file at {}",
                dir.display()
            )
        })?;
        let serialized =
            toml::to_string_pretty(self).context("failed to serialize state file to TOML")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write state file to {}", path.display()))?;
        Ok(())
    }

    /// Drops the user example titled `title`. Returns whether one was found.
    pub fn remove_user_example(&mut self, title: &str) -> bool {
        let before = self.user_examples.len();
        self.user_examples
            .retain(|example| example.title().as_deref() != Some(title));
        before != self.user_examples.len()
    }

    pub fn remember_section(&mut self, title: &str) {
        if !self.sections.iter().any(|section| section == title) {
            self.sections.push(title.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let state = AppState {
            last_example: Some("Step".into()),
            removed: vec!["Line".into()],
            sections: vec!["Sketches".into()],
            user_examples: vec![UserExample {
                section: "Sketches".into(),
                path: dir.path().join("waves.frag"),
            }],
        };
        state.persist(&path).unwrap();

        assert_eq!(AppState::load_or_default(&path).unwrap(), state);
    }

    #[test]
    fn missing_state_is_default() {
        let dir = TempDir::new().unwrap();
        let state = AppState::load_or_default(&dir.path().join("state.toml")).unwrap();
        assert_eq!(state, AppState::default());
    }

    #[test]
    fn remove_user_example_matches_file_stem() {
        let mut state = AppState {
            user_examples: vec![UserExample {
                section: "Sketches".into(),
                path: PathBuf::from("/tmp/waves.frag"),
            }],
            ..AppState::default()
        };
        assert!(!state.remove_user_example("ripple"));
        assert!(state.remove_user_example("waves"));
        assert!(state.user_examples.is_empty());
    }
}
