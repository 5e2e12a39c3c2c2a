use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    #[default]
    Threaded,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderbookConfig {
    pub version: u32,
    /// How often accepted edits are written back; `None` writes only on exit.
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub autosave: Option<Duration>,
    #[serde(default)]
    pub preview: PreviewSettings,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewSettings {
    #[serde(default, deserialize_with = "deserialize_size_opt")]
    pub size: Option<(u32, u32)>,
    /// 0 or absent means uncapped.
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(default)]
    pub compile: CompileMode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionConfig {
    pub title: String,
    #[serde(default)]
    pub examples: Vec<ExampleConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExampleConfig {
    /// Defaults to the file stem.
    #[serde(default)]
    pub title: Option<String>,
    pub file: String,
}

impl ExampleConfig {
    pub fn resolved_title(&self) -> Option<String> {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => Some(title.to_string()),
            _ => Path::new(&self.file)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .filter(|stem| !stem.is_empty()),
        }
    }
}

impl Default for ShaderbookConfig {
    fn default() -> Self {
        Self {
            version: 1,
            autosave: None,
            preview: PreviewSettings::default(),
            sections: Vec::new(),
        }
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(|secs| Some(Duration::from_secs(secs)))
                .map_err(|_| E::custom("duration must be non-negative"))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_size_opt<'de, D>(deserializer: D) -> Result<Option<(u32, u32)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_size(&value).map_err(de::Error::custom))
        .transpose()
}

/// Parses `WIDTHxHEIGHT` (also accepts `X` and `×`).
pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let normalized = value.trim().replace(['X', '×'], "x");
    let (width, height) = normalized
        .split_once('x')
        .ok_or_else(|| format!("invalid size '{value}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{value}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{value}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{value}' must be non-zero"));
    }
    Ok((width, height))
}

impl ShaderbookConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ShaderbookConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Frame cap with the "0 means uncapped" convention applied.
    pub fn target_fps(&self) -> Option<f32> {
        self.preview.fps.filter(|fps| *fps > 0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if let Some(autosave) = self.autosave {
            if autosave.is_zero() {
                return Err(ConfigError::Invalid(
                    "autosave interval must be greater than zero".into(),
                ));
            }
        }

        if let Some(fps) = self.preview.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("preview.fps must be >= 0".into()));
            }
        }

        let mut titles = BTreeSet::new();
        for section in &self.sections {
            let title = section.title.trim();
            if title.is_empty() {
                return Err(ConfigError::Invalid(
                    "section title may not be empty".into(),
                ));
            }
            if !titles.insert(title) {
                return Err(ConfigError::Invalid(format!(
                    "section '{title}' is defined more than once"
                )));
            }

            for example in &section.examples {
                if example.file.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "section '{title}' contains an example with an empty file"
                    )));
                }
                if example.resolved_title().is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "section '{title}' example '{}' has no usable title",
                        example.file
                    )));
                }
            }
        }

        Ok(())
    }
}
