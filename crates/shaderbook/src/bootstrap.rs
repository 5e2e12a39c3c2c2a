use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use catalog::{bundled_shaders, Catalog, Example, SourceResolver};
use shaderconfig::ShaderbookConfig;
use tracing::{debug, info, warn};

use crate::paths::{expand_user_path, AppPaths};
use crate::state::AppState;

/// Everything the subcommands need after start-up.
pub struct Workspace {
    pub paths: AppPaths,
    pub config: ShaderbookConfig,
    pub state: AppState,
}

impl Workspace {
    pub fn load(paths: AppPaths) -> Result<Self> {
        bootstrap_filesystem(&paths)?;

        let config_path = paths.config_file();
        let config = ShaderbookConfig::load_or_default(&config_path)
            .with_context(|| format!("failed to load config at {}", config_path.display()))?;
        let state = AppState::load_or_default(&paths.state_file())?;

        Ok(Self {
            paths,
            config,
            state,
        })
    }

    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::new(self.paths.shader_dir())
    }

    pub fn catalog(&self) -> Catalog {
        build_catalog(&self.paths, &self.config, &self.state, &self.resolver())
    }

    pub fn save_state(&self) -> Result<()> {
        self.state.persist(&self.paths.state_file())
    }
}

pub fn bootstrap_filesystem(paths: &AppPaths) -> Result<()> {
    for dir in [
        paths.config_dir().to_path_buf(),
        paths.data_dir().to_path_buf(),
        paths.cache_dir().to_path_buf(),
        paths.shader_dir(),
    ] {
        ensure_directory(&dir)?;
    }

    install_bundled_shaders(&paths.shader_dir())?;
    Ok(())
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if path.is_dir() {
            debug!(path = %path.display(), "reusing existing directory");
            Ok(())
        } else {
            bail!("filesystem entry at {} is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path).with_context(|| {
            format!("failed to create shaderbook directory at {}", path.display())
        })?;
        info!(path = %path.display(), "created shaderbook directory");
        Ok(())
    }
}

/// Copies the bundled lesson shaders into `dir`, leaving files that already
/// exist alone so earlier edits survive. Returns how many were written.
pub fn install_bundled_shaders(dir: &Path) -> Result<usize> {
    let resolver = SourceResolver::new(dir);
    let mut installed = 0;
    for shader in bundled_shaders() {
        let target = resolver.bundle_path(shader.name);
        if target.exists() {
            continue;
        }
        fs::write(&target, shader.source)
            .with_context(|| format!("failed to install shader at {}", target.display()))?;
        installed += 1;
    }

    if installed > 0 {
        info!(count = installed, dir = %dir.display(), "installed bundled shaders");
    }
    Ok(installed)
}

/// Seed first, then configured sections, then CLI-added examples. Removed
/// titles are hidden before CLI additions so a re-added title shows the user's
/// file. Titles stay unique; later duplicates are skipped with a warning.
pub fn build_catalog(
    paths: &AppPaths,
    config: &ShaderbookConfig,
    state: &AppState,
    resolver: &SourceResolver,
) -> Catalog {
    let mut catalog = Catalog::seeded(resolver);

    for section in &config.sections {
        let section_title = section.title.trim();
        catalog.add_section(section_title);
        for example in &section.examples {
            let Some(title) = example.resolved_title() else {
                continue;
            };
            match expand_user_path(&example.file, paths.config_dir()) {
                Ok(path) => add_unique(&mut catalog, resolver, section_title, title, &path),
                Err(err) => warn!(example = %title, "skipping configured example: {err:#}"),
            }
        }
    }

    for section in &state.sections {
        catalog.add_section(section.as_str());
    }

    for title in &state.removed {
        if catalog.remove_example(title).is_some() {
            debug!(example = %title, "hid removed example");
        }
    }

    for example in &state.user_examples {
        let Some(title) = example.title() else {
            warn!(path = %example.path.display(), "skipping user example without a title");
            continue;
        };
        catalog.add_section(example.section.as_str());
        add_unique(&mut catalog, resolver, &example.section, title, &example.path);
    }

    catalog
}

fn add_unique(
    catalog: &mut Catalog,
    resolver: &SourceResolver,
    section: &str,
    title: String,
    path: &Path,
) {
    if catalog.find_example(&title).is_some() {
        warn!(example = %title, section, "an example with this title already exists; skipping");
        return;
    }
    let resolved = resolver.read_or_create(path);
    catalog.add_example(section, Example::from_resolved(title, resolved));
}
