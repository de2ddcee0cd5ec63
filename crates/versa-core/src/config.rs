//! Configuration management for versa.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/versa/versa.json` (or `.jsonc`)
//! 2. Environment variable: `VERSA_CONFIG_CONTENT`
//! 3. Project config: `versa.json` or `versa.jsonc` in the project directory
//! 4. Environment overrides: `VERSA_*` variables
//!
//! Supports JSONC (JSON with comments) and `{env:VAR_NAME}` substitution.

use crate::error::{ConfigError, ConfigResult};
use crate::policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use versa_diff::DiffConfig;

/// Static regex for variable substitution, compiled once.
static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{env:([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Default number of body lines shown in history previews.
pub const DEFAULT_PREVIEW_LINES: usize = 3;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersaConfig {
    /// Log level name (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_versioning: Option<AutoVersioningConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

/// Auto-versioning policy settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoVersioningConfig {
    /// Minimum seconds between automatic snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_save_interval: Option<u64>,

    /// Retention cap per content item. Zero disables pruning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_versions_per_content: Option<usize>,

    /// Minimum dissimilarity, in percent, for a new snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_changes_for_version: Option<f64>,
}

/// Diff engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSettings {
    /// Largest comparison input in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_comparison_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,

    /// Whether comparison results are cached in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_enabled: Option<bool>,
}

/// History query settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_lines: Option<usize>,
}

/// Storage backend settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the JSON backend. Memory storage when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl VersaConfig {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/versa/`
    /// 2. `VERSA_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    /// 4. `VERSA_*` overrides
    ///
    /// Returns the merged config and the files it was read from.
    pub async fn load(project_dir: Option<&Path>) -> ConfigResult<(Self, Vec<PathBuf>)> {
        let mut config = VersaConfig::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = Self::global_config_dir() {
            if let Some(path) = Self::find_file(&global_dir) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Ok(content) = std::env::var("VERSA_CONFIG_CONTENT") {
            let content = Self::substitute_variables(&content)?;
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            if let Some(path) = Self::find_file(dir) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        let config = config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok((config, sources))
    }

    fn find_file(dir: &Path) -> Option<PathBuf> {
        ["versa.jsonc", "versa.json"]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Get the global config directory.
    ///
    /// On Unix systems, prefers `~/.config/versa` over the
    /// platform-specific directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            if let Some(home) = dirs::home_dir() {
                let xdg_config = home.join(".config").join("versa");
                if xdg_config.exists() {
                    return Some(xdg_config);
                }
            }
        }

        dirs::config_dir().map(|d| d.join("versa"))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::substitute_variables(&content)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Parse JSONC (JSON with comments).
    pub fn parse_jsonc(content: &str, source: &str) -> ConfigResult<Self> {
        let stripped = strip_comments(content);

        serde_json::from_str(&stripped).map_err(|e| ConfigError::InvalidJson {
            path: source.to_string(),
            message: e.to_string(),
        })
    }

    /// Replace `{env:NAME}` references with the variable's value.
    fn substitute_variables(content: &str) -> ConfigResult<String> {
        let mut result = content.to_string();

        for cap in var_regex().captures_iter(content) {
            let (Some(full_match), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = std::env::var(name.as_str()).map_err(|_| ConfigError::EnvVarNotFound {
                name: name.as_str().to_string(),
            })?;
            result = result.replace(full_match.as_str(), &value);
        }

        Ok(result)
    }

    /// Apply `VERSA_*` overrides read through `lookup`.
    pub fn apply_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        fn parsed<T: std::str::FromStr>(name: &str, value: String) -> ConfigResult<T> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    name: name.to_string(),
                    value,
                })
        }

        if let Some(level) = lookup("VERSA_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(dir) = lookup("VERSA_DATA_DIR") {
            self.storage.get_or_insert_with(Default::default).data_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup("VERSA_AUTO_SAVE_INTERVAL") {
            self.auto_versioning
                .get_or_insert_with(Default::default)
                .auto_save_interval = Some(parsed("VERSA_AUTO_SAVE_INTERVAL", value)?);
        }
        if let Some(value) = lookup("VERSA_MAX_VERSIONS") {
            self.auto_versioning
                .get_or_insert_with(Default::default)
                .max_versions_per_content = Some(parsed("VERSA_MAX_VERSIONS", value)?);
        }
        if let Some(value) = lookup("VERSA_MIN_CHANGES") {
            self.auto_versioning
                .get_or_insert_with(Default::default)
                .min_changes_for_version = Some(parsed("VERSA_MIN_CHANGES", value)?);
        }
        if let Some(value) = lookup("VERSA_MAX_COMPARISON_SIZE") {
            self.diff.get_or_insert_with(Default::default).max_comparison_size =
                Some(parsed("VERSA_MAX_COMPARISON_SIZE", value)?);
        }

        Ok(self)
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }

        self.auto_versioning = match (self.auto_versioning, other.auto_versioning) {
            (Some(base), Some(o)) => Some(AutoVersioningConfig {
                auto_save_interval: o.auto_save_interval.or(base.auto_save_interval),
                max_versions_per_content: o
                    .max_versions_per_content
                    .or(base.max_versions_per_content),
                min_changes_for_version: o
                    .min_changes_for_version
                    .or(base.min_changes_for_version),
            }),
            (b, o) => o.or(b),
        };

        self.diff = match (self.diff, other.diff) {
            (Some(base), Some(o)) => Some(DiffSettings {
                max_comparison_size: o.max_comparison_size.or(base.max_comparison_size),
                cache_ttl_secs: o.cache_ttl_secs.or(base.cache_ttl_secs),
                cache_enabled: o.cache_enabled.or(base.cache_enabled),
            }),
            (b, o) => o.or(b),
        };

        self.history = match (self.history, other.history) {
            (Some(base), Some(o)) => Some(HistoryConfig {
                preview_lines: o.preview_lines.or(base.preview_lines),
            }),
            (b, o) => o.or(b),
        };

        self.storage = match (self.storage, other.storage) {
            (Some(base), Some(o)) => Some(StorageConfig {
                data_dir: o.data_dir.or(base.data_dir),
            }),
            (b, o) => o.or(b),
        };

        self
    }

    /// Resolved auto-versioning policy.
    pub fn policy_config(&self) -> PolicyConfig {
        let defaults = PolicyConfig::default();
        let Some(section) = &self.auto_versioning else {
            return defaults;
        };
        PolicyConfig {
            auto_save_interval: section
                .auto_save_interval
                .map(Duration::from_secs)
                .unwrap_or(defaults.auto_save_interval),
            max_versions_per_content: section
                .max_versions_per_content
                .unwrap_or(defaults.max_versions_per_content),
            min_changes_for_version: section
                .min_changes_for_version
                .unwrap_or(defaults.min_changes_for_version),
        }
    }

    /// Resolved diff engine limits.
    pub fn diff_config(&self) -> DiffConfig {
        let defaults = DiffConfig::default();
        let Some(section) = &self.diff else {
            return defaults;
        };
        DiffConfig {
            max_comparison_size: section
                .max_comparison_size
                .unwrap_or(defaults.max_comparison_size),
            cache_ttl: section
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.diff
            .as_ref()
            .and_then(|d| d.cache_enabled)
            .unwrap_or(true)
    }

    pub fn preview_lines(&self) -> usize {
        self.history
            .as_ref()
            .and_then(|h| h.preview_lines)
            .unwrap_or(DEFAULT_PREVIEW_LINES)
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.storage.as_ref().and_then(|s| s.data_dir.as_deref())
    }
}

/// Strip `//` and `/* */` comments outside of strings.
fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string {
            result.push(c);
            escape_next = true;
            continue;
        }

        if c == '"' {
            in_string = !in_string;
            result.push(c);
            continue;
        }

        if in_string {
            result.push(c);
            continue;
        }

        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        // Keep line numbers stable for parse errors.
                        if c == '\n' {
                            result.push('\n');
                        }
                        prev = c;
                    }
                    continue;
                }
                _ => {}
            }
        }

        result.push(c);
    }

    result
}
