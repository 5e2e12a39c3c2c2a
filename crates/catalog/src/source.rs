//! Loads example sources from disk and writes edits back.
//!
//! A source reference is either a bare bundle name (`02-hello-world`) or a
//! file path. Resolution never fails: unreadable or missing sources degrade to
//! empty text with a warning so the catalog always has something to hand the
//! compile pipeline.
//!
//! Types:
//!
//! - `SourceResolver` remembers the bundle directory (the installed copy of the
//!   shaders compiled into the binary) and resolves references against it.
//! - `ResolvedSource` carries the text together with the file edits should be
//!   persisted to.
//! - `SourceError` classifies I/O failures for callers that want to surface
//!   them instead of degrading.
//!
//! Functions:
//!
//! - `SourceResolver::resolve` applies the lookup order: bundle directory,
//!   embedded copy, plain path, create-empty.
//! - `SourceResolver::read_or_create` implements the path half of that order
//!   for user-supplied files.
//! - `persist_source` replaces a file atomically through a sibling temp file.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::seed::bundled_shader;

pub const SOURCE_EXTENSION: &str = "frag";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read shader source {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to create shader source {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("failed to write shader source {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Where a resolved source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Read from `<bundle_dir>/<name>.frag`.
    Bundled,
    /// Bundle file missing; the copy compiled into the binary was used.
    Embedded,
    /// Read from a plain file path.
    File,
    /// Nothing existed, so an empty file was created.
    Created,
    /// The file existed or was expected but could not be read or created.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub reference: String,
    pub text: String,
    pub backing: Option<PathBuf>,
    pub origin: SourceOrigin,
}

#[derive(Debug, Clone)]
pub struct SourceResolver {
    bundle_dir: PathBuf,
}

impl SourceResolver {
    pub fn new(bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
        }
    }

    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }

    /// Path a bundle name maps to inside the bundle directory.
    pub fn bundle_path(&self, name: &str) -> PathBuf {
        self.bundle_dir.join(format!("{name}.{SOURCE_EXTENSION}"))
    }

    pub fn resolve(&self, reference: &str) -> ResolvedSource {
        if is_bundle_name(reference) {
            let candidate = self.bundle_path(reference);
            if candidate.is_file() {
                debug!(reference, path = %candidate.display(), "resolved bundled shader");
                return match read_source(&candidate) {
                    Ok(text) => ResolvedSource {
                        reference: reference.to_string(),
                        text,
                        backing: Some(candidate),
                        origin: SourceOrigin::Bundled,
                    },
                    Err(err) => degraded(reference, Some(candidate), err),
                };
            }

            if let Some(shader) = bundled_shader(reference) {
                debug!(
                    reference,
                    path = %candidate.display(),
                    "bundle file missing; using embedded shader"
                );
                return ResolvedSource {
                    reference: reference.to_string(),
                    text: shader.source.to_string(),
                    backing: Some(candidate),
                    origin: SourceOrigin::Embedded,
                };
            }
        }

        let mut resolved = self.read_or_create(Path::new(reference));
        resolved.reference = reference.to_string();
        resolved
    }

    /// Reads `path`, creating an empty file there when it does not exist.
    pub fn read_or_create(&self, path: &Path) -> ResolvedSource {
        let reference = path.display().to_string();
        if path.exists() {
            return match read_source(path) {
                Ok(text) => {
                    debug!(path = %path.display(), "resolved shader file");
                    ResolvedSource {
                        reference,
                        text,
                        backing: Some(path.to_path_buf()),
                        origin: SourceOrigin::File,
                    }
                }
                Err(err) => degraded(&reference, Some(path.to_path_buf()), err),
            };
        }

        match create_empty(path) {
            Ok(()) => {
                debug!(path = %path.display(), "created empty shader file");
                ResolvedSource {
                    reference,
                    text: String::new(),
                    backing: Some(path.to_path_buf()),
                    origin: SourceOrigin::Created,
                }
            }
            Err(err) => degraded(&reference, None, err),
        }
    }
}

/// Writes `text` to `path` by way of a sibling temp file and a rename, so
/// readers never observe a partially written shader.
pub fn persist_source(path: &Path, text: &str) -> Result<(), SourceError> {
    let write_err = |source| SourceError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }

    let temp = temp_sibling(path);
    let result = fs::File::create(&temp)
        .and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, path));

    if let Err(err) = result {
        let _ = fs::remove_file(&temp);
        return Err(write_err(err));
    }

    debug!(path = %path.display(), bytes = text.len(), "persisted shader source");
    Ok(())
}

fn is_bundle_name(reference: &str) -> bool {
    let path = Path::new(reference);
    !reference.is_empty() && path.components().count() == 1 && path.extension().is_none()
}

fn read_source(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn create_empty(path: &Path) -> Result<(), SourceError> {
    let create_err = |source| SourceError::Create {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(create_err)?;
    }
    fs::File::create(path).map(drop).map_err(create_err)
}

fn degraded(reference: &str, backing: Option<PathBuf>, err: SourceError) -> ResolvedSource {
    warn!(reference, error = %err, "shader source unavailable; using empty source");
    ResolvedSource {
        reference: reference.to_string(),
        text: String::new(),
        backing,
        origin: SourceOrigin::Unavailable,
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shader".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_bundle_directory_copy() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SourceResolver::new(dir.path());
        let path = resolver.bundle_path("02-hello-world");
        fs::write(&path, "// user edit").unwrap();

        let resolved = resolver.resolve("02-hello-world");
        assert_eq!(resolved.origin, SourceOrigin::Bundled);
        assert_eq!(resolved.text, "// user edit");
        assert_eq!(resolved.backing.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn falls_back_to_embedded_shader() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SourceResolver::new(dir.path());

        let resolved = resolver.resolve("06a-color-mix");
        assert_eq!(resolved.origin, SourceOrigin::Embedded);
        assert!(resolved.text.contains("mix("));
        assert_eq!(
            resolved.backing,
            Some(dir.path().join("06a-color-mix.frag"))
        );
    }

    #[test]
    fn resolves_plain_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waves.frag");
        fs::write(&path, "void main() {}").unwrap();

        let resolver = SourceResolver::new(dir.path().join("bundle"));
        let resolved = resolver.resolve(path.to_str().unwrap());
        assert_eq!(resolved.origin, SourceOrigin::File);
        assert_eq!(resolved.text, "void main() {}");
        assert_eq!(resolved.reference, path.to_str().unwrap());
    }

    #[test]
    fn creates_missing_file_with_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("new.frag");

        let resolver = SourceResolver::new(dir.path());
        let resolved = resolver.resolve(path.to_str().unwrap());
        assert_eq!(resolved.origin, SourceOrigin::Created);
        assert!(resolved.text.is_empty());
        assert!(path.is_file());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn unreadable_source_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.frag");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let resolver = SourceResolver::new(dir.path());
        let resolved = resolver.read_or_create(&path);
        assert_eq!(resolved.origin, SourceOrigin::Unavailable);
        assert!(resolved.text.is_empty());
    }

    #[test]
    fn persist_replaces_contents_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.frag");
        fs::write(&path, "old").unwrap();

        persist_source(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn persist_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("shader.frag");
        persist_source(&path, "void main() {}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "void main() {}");
    }
}
