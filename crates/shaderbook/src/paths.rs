use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories_next::{BaseDirs, ProjectDirs};
use tracing::debug;

pub const ENV_CONFIG_DIR: &str = "SHADERBOOK_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "SHADERBOOK_DATA_DIR";
pub const ENV_CACHE_DIR: &str = "SHADERBOOK_CACHE_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Shaderbook";
const APPLICATION: &str = "shaderbook";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        Ok(Self {
            config_dir: resolve_dir(ENV_CONFIG_DIR, project_dirs.config_dir()),
            data_dir: resolve_dir(ENV_DATA_DIR, project_dirs.data_dir()),
            cache_dir: resolve_dir(ENV_CACHE_DIR, project_dirs.cache_dir()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("state.toml")
    }

    /// Where the bundled lesson shaders are installed and edited.
    pub fn shader_dir(&self) -> PathBuf {
        self.data_dir.join("shaders")
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, data_dir: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
            cache_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: &Path) -> PathBuf {
    env_override(env_var).unwrap_or_else(|| default.to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

/// Expands `$VAR`, `${VAR}` and a leading `~` in a user-supplied path, then
/// anchors relative results at `cwd`.
pub fn expand_user_path(input: &str, cwd: &Path) -> Result<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("path must not be empty");
    }

    let expanded = PathBuf::from(expand_home(&expand_env_vars(trimmed)?)?);
    let path = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };
    debug!(original = %input, expanded = %path.display(), "expanded shader path");
    Ok(path)
}

/// Same as [`expand_user_path`], relative to the process working directory.
pub fn expand_from_cwd(input: &str) -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to resolve current working directory")?;
    expand_user_path(input, &cwd)
}

fn expand_home(input: &str) -> Result<String> {
    if !input.starts_with('~') {
        return Ok(input.to_string());
    }

    let base_dirs = BaseDirs::new()
        .ok_or_else(|| anyhow!("unable to determine home directory for '~' expansion"))?;
    let home_dir = base_dirs.home_dir();

    if input == "~" {
        return Ok(home_dir.to_string_lossy().into_owned());
    }

    if let Some(rest) = input.strip_prefix("~/") {
        return Ok(home_dir.join(rest).to_string_lossy().into_owned());
    }

    bail!("user-specific home expansion ('{input}') is not supported")
}

fn expand_env_vars(input: &str) -> Result<String> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            output.push(ch);
            continue;
        }

        let name = match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    bail!("missing closing '}}' in environment variable reference");
                }
                if name.is_empty() {
                    bail!("environment variable name must not be empty");
                }
                name
            }
            Some(&c) if is_env_name_char(c) => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_env_name_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                name
            }
            _ => {
                output.push('$');
                continue;
            }
        };

        let value =
            env::var(&name).map_err(|_| anyhow!("environment variable '{name}' is not set"))?;
        output.push_str(&value);
    }

    Ok(output)
}

fn is_env_name_char(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let data_dir = root.path().join("data");
        let cache_dir = root.path().join("cache");

        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _data_guard = EnvGuard::set(ENV_DATA_DIR, &data_dir);
        let _cache_guard = EnvGuard::set(ENV_CACHE_DIR, &cache_dir);

        let paths = AppPaths::discover().unwrap();

        assert_eq!(paths.config_dir(), config_dir.as_path());
        assert_eq!(paths.data_dir(), data_dir.as_path());
        assert_eq!(paths.cache_dir(), cache_dir.as_path());
        assert_eq!(paths.state_file(), config_dir.join("state.toml"));
        assert_eq!(paths.shader_dir(), data_dir.join("shaders"));
    }

    #[test]
    fn empty_override_falls_back_to_project_dirs() {
        let _guard = env_lock().lock().unwrap();
        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, "");
        let paths = AppPaths::discover().unwrap();
        assert!(!paths.config_dir().as_os_str().is_empty());
    }

    #[test]
    fn expands_environment_variables() {
        let _guard = env_lock().lock().unwrap();
        let _var = EnvGuard::set("SHADERBOOK_PATH_TEST", "sketches");
        let path = expand_user_path("/tmp/$SHADERBOOK_PATH_TEST/${SHADERBOOK_PATH_TEST}.frag", Path::new("/"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/sketches/sketches.frag"));
    }

    #[test]
    fn missing_variable_is_an_error() {
        let _guard = env_lock().lock().unwrap();
        let _var = EnvGuard::clear("SHADERBOOK_UNSET_FOR_TEST");
        let err = expand_user_path("$SHADERBOOK_UNSET_FOR_TEST/a.frag", Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("SHADERBOOK_UNSET_FOR_TEST"));
    }

    #[test]
    fn relative_paths_anchor_at_cwd() {
        let path = expand_user_path("waves.frag", Path::new("/work")).unwrap();
        assert_eq!(path, PathBuf::from("/work/waves.frag"));
    }

    #[test]
    fn expands_home_prefix() {
        let home = BaseDirs::new().unwrap().home_dir().to_path_buf();
        let path = expand_user_path("~/shaders/a.frag", Path::new("/")).unwrap();
        assert_eq!(path, home.join("shaders/a.frag"));
    }
}
