//! Configuration resolution.
//!
//! Settings come from four sources. Each value remembers where it came from:
//!
//! 1. Built-in defaults
//! 2. `remap.toml` at the workspace root
//! 3. `REMAP_*` environment variables
//! 4. CLI flags (highest precedence)
//!
//! ```toml
//! max_rounds = 8
//! include = ["src/**"]
//! exclude = ["src/generated/**"]
//! parallel = true
//! index = "build/remap-index.json"
//!
//! [[mappings]]
//! path = "mappings/intermediary.tiny"
//! from = "official"
//! to = "intermediary"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use remap_core::artifact::{ArtifactFilter, StoreError};
use remap_core::coordinator::{RunOptions, DEFAULT_MAX_ROUNDS};
use remap_core::error::RemapError;

/// Project configuration file name.
pub const CONFIG_FILE: &str = "remap.toml";

pub const ENV_MAX_ROUNDS: &str = "REMAP_MAX_ROUNDS";
pub const ENV_INCLUDE: &str = "REMAP_INCLUDE";
pub const ENV_EXCLUDE: &str = "REMAP_EXCLUDE";
pub const ENV_SERIAL: &str = "REMAP_SERIAL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

impl From<ConfigError> for RemapError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { .. } => RemapError::internal(err.to_string()),
            other => RemapError::invalid_args(other.to_string()),
        }
    }
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From `remap.toml`.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Mapping Hops
// ============================================================================

/// One hop of the mapping chain: a file and the namespaces to read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingSpec {
    pub path: PathBuf,
    /// Namespace to map from; defaults to the previous hop's target or the
    /// file's source namespace.
    #[serde(default)]
    pub from: Option<String>,
    /// Namespace to map to; defaults to the file's last namespace.
    #[serde(default)]
    pub to: Option<String>,
}

impl MappingSpec {
    /// Parse the CLI form `PATH[@FROM:TO]`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let Some((path, namespaces)) = spec.rsplit_once('@') else {
            return Ok(MappingSpec {
                path: PathBuf::from(spec),
                from: None,
                to: None,
            });
        };
        let (from, to) = namespaces.split_once(':').ok_or_else(|| {
            format!("invalid mapping '{}', expected PATH or PATH@FROM:TO", spec)
        })?;
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok(MappingSpec {
            path: PathBuf::from(path),
            from: non_empty(from),
            to: non_empty(to),
        })
    }
}

/// `remap.toml` contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectConfig {
    max_rounds: Option<u32>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    parallel: Option<bool>,
    index: Option<PathBuf>,
    #[serde(default)]
    mappings: Vec<MappingSpec>,
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// Resolved configuration with precedence information.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub max_rounds: Option<ConfigValue<u32>>,
    pub parallel: Option<ConfigValue<bool>>,
    pub include_patterns: Vec<ConfigValue<String>>,
    pub exclude_patterns: Vec<ConfigValue<String>>,
    /// Chain hops in order. Paths from `remap.toml` are joined to the
    /// workspace root.
    pub mappings: Vec<ConfigValue<MappingSpec>>,
    pub index: Option<ConfigValue<PathBuf>>,
}

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --max-rounds flag.
    pub max_rounds: Option<u32>,
    /// --serial flag.
    pub serial: bool,
    /// --include flags.
    pub include_patterns: Vec<String>,
    /// --exclude flags.
    pub exclude_patterns: Vec<String>,
    /// --mapping flags.
    pub mappings: Vec<MappingSpec>,
    /// --index flag.
    pub index: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn new() -> Self {
        ResolvedConfig::default()
    }

    /// Resolve configuration from all sources, reading the process
    /// environment.
    pub fn resolve(workspace_root: &Path, cli_overrides: &CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(workspace_root, cli_overrides, |name| std::env::var(name).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env(
        workspace_root: &Path,
        cli_overrides: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = ResolvedConfig::new();
        config.apply_defaults();

        let project_path = workspace_root.join(CONFIG_FILE);
        if project_path.exists() {
            config.apply_project_config(workspace_root, &project_path)?;
        }

        config.apply_env_vars(env)?;
        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        self.max_rounds = Some(ConfigValue::new(DEFAULT_MAX_ROUNDS, ConfigSource::Default));
        self.parallel = Some(ConfigValue::new(true, ConfigSource::Default));
    }

    fn apply_project_config(&mut self, workspace_root: &Path, path: &Path) -> Result<(), ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let project: ProjectConfig = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        debug!(path = %path.display(), "loaded project config");
        let source = ConfigSource::ProjectConfig;

        if let Some(rounds) = project.max_rounds {
            self.set_max_rounds(rounds, source);
        }
        if let Some(parallel) = project.parallel {
            self.set_parallel(parallel, source);
        }
        if let Some(include) = project.include {
            replace_patterns(&mut self.include_patterns, include, source);
        }
        if let Some(exclude) = project.exclude {
            replace_patterns(&mut self.exclude_patterns, exclude, source);
        }
        if let Some(index) = project.index {
            self.index = Some(ConfigValue::new(workspace_root.join(index), source));
        }
        if !project.mappings.is_empty() {
            self.mappings = project
                .mappings
                .into_iter()
                .map(|spec| {
                    let spec = MappingSpec {
                        path: workspace_root.join(&spec.path),
                        ..spec
                    };
                    ConfigValue::new(spec, source)
                })
                .collect();
        }
        Ok(())
    }

    fn apply_env_vars(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let source = ConfigSource::EnvVar;

        if let Some(rounds) = env(ENV_MAX_ROUNDS) {
            let parsed = rounds.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_MAX_ROUNDS.to_string(),
                value: rounds.clone(),
            })?;
            self.set_max_rounds(parsed, source);
        }

        if let Some(include) = env(ENV_INCLUDE) {
            replace_patterns(&mut self.include_patterns, split_list(&include), source);
        }

        if let Some(exclude) = env(ENV_EXCLUDE) {
            replace_patterns(&mut self.exclude_patterns, split_list(&exclude), source);
        }

        if let Some(serial) = env(ENV_SERIAL) {
            let serial = match serial.trim() {
                "1" | "true" | "yes" => true,
                "" | "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: ENV_SERIAL.to_string(),
                        value: serial,
                    })
                }
            };
            self.set_parallel(!serial, source);
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let source = ConfigSource::CliFlag;

        if let Some(rounds) = overrides.max_rounds {
            self.set_max_rounds(rounds, source);
        }

        if overrides.serial {
            self.set_parallel(false, source);
        }

        if !overrides.include_patterns.is_empty() {
            replace_patterns(&mut self.include_patterns, overrides.include_patterns.clone(), source);
        }

        if !overrides.exclude_patterns.is_empty() {
            replace_patterns(&mut self.exclude_patterns, overrides.exclude_patterns.clone(), source);
        }

        if !overrides.mappings.is_empty() {
            self.mappings = overrides
                .mappings
                .iter()
                .cloned()
                .map(|spec| ConfigValue::new(spec, source))
                .collect();
        }

        if let Some(ref index) = overrides.index {
            self.index = Some(ConfigValue::new(index.clone(), source));
        }
    }

    fn set_max_rounds(&mut self, rounds: u32, source: ConfigSource) {
        let value = ConfigValue::new(rounds, source);
        self.max_rounds = Some(match self.max_rounds.take() {
            Some(current) => current.merge(value),
            None => value,
        });
    }

    fn set_parallel(&mut self, parallel: bool, source: ConfigSource) {
        let value = ConfigValue::new(parallel, source);
        self.parallel = Some(match self.parallel.take() {
            Some(current) => current.merge(value),
            None => value,
        });
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_rounds: self
                .max_rounds
                .as_ref()
                .map(|v| v.value)
                .unwrap_or(DEFAULT_MAX_ROUNDS),
            parallel: self.parallel.as_ref().map(|v| v.value).unwrap_or(true),
        }
    }

    pub fn filter(&self) -> Result<ArtifactFilter, StoreError> {
        let include: Vec<String> = self.include_patterns.iter().map(|v| v.value.clone()).collect();
        let exclude: Vec<String> = self.exclude_patterns.iter().map(|v| v.value.clone()).collect();
        ArtifactFilter::new(&include, &exclude)
    }

    pub fn mapping_specs(&self) -> Vec<MappingSpec> {
        self.mappings.iter().map(|v| v.value.clone()).collect()
    }

    pub fn index_path(&self) -> Option<&Path> {
        self.index.as_ref().map(|v| v.value.as_path())
    }
}

/// Patterns from a higher source replace the whole list.
fn replace_patterns(list: &mut Vec<ConfigValue<String>>, patterns: Vec<String>, source: ConfigSource) {
    if list.iter().any(|v| v.source > source) {
        return;
    }
    *list = patterns
        .into_iter()
        .map(|p| ConfigValue::new(p, source))
        .collect();
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
