//! Watches an example's backing file so edits made in any text editor reach
//! the compile pipeline.
//!
//! The parent directory is watched rather than the file itself: most editors
//! save by writing a temp file and renaming it over the original, which would
//! orphan a watch on the old inode.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    target: PathBuf,
    changes: Receiver<()>,
}

impl SourceWatcher {
    pub fn new(target: &Path) -> Result<Self> {
        let dir = target
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| anyhow!("{} has no parent directory to watch", target.display()))?
            .to_path_buf();
        let file_name = target
            .file_name()
            .ok_or_else(|| anyhow!("{} does not name a file", target.display()))?
            .to_os_string();

        let (tx, rx) = unbounded();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if !is_content_change(&event.kind) {
                        return;
                    }
                    if event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == Some(file_name.as_os_str()))
                    {
                        let _ = tx.send(());
                    }
                }
                Err(err) => warn!("watch error: {err}"),
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(1)),
        )
        .context("failed to create file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        debug!(path = %target.display(), "watching shader source");

        Ok(Self {
            _watcher: watcher,
            target: target.to_path_buf(),
            changes: rx,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Waits up to `timeout` for a change; bursts of events collapse into one.
    pub fn wait_for_change(&self, timeout: Duration) -> Result<bool> {
        match self.changes.recv_timeout(timeout) {
            Ok(()) => {
                while self.changes.try_recv().is_ok() {}
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("file watcher stopped")),
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind};

    #[test]
    fn only_writes_count_as_changes() {
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(!is_content_change(&EventKind::Access(AccessKind::Read)));
    }

    #[test]
    fn rejects_paths_without_parent() {
        assert!(SourceWatcher::new(Path::new("shader.frag")).is_err());
    }
}
