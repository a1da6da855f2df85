//! Configuration file loading with precedence handling.

use crate::model::BranchSort;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Prefix of every environment variable the browser reads.
const ENV_PREFIX: &str = "REPOTUI_";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax or an invalid value.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// How a newly opened view shares the screen with its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPreference {
    /// Vertical split on wide terminals, fullscreen otherwise.
    #[default]
    Auto,
    /// Always split side by side when possible.
    Vertical,
    /// Always split top and bottom.
    Horizontal,
}

impl SplitPreference {
    /// Parse a setting value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "vertical" | "v" => Some(Self::Vertical),
            "horizontal" | "h" => Some(Self::Horizontal),
            _ => None,
        }
    }
}

/// Height of the lower view in a horizontal split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SplitHeight {
    /// Fixed number of lines.
    Lines(u16),
    /// Percentage of the parent's height.
    Percent(u16),
}

impl Default for SplitHeight {
    fn default() -> Self {
        Self::Percent(50)
    }
}

impl SplitHeight {
    /// Parse `N` (lines) or `N%` (percentage, 1 to 100).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_suffix('%') {
            Some(pct) => match pct.trim().parse::<u16>() {
                Ok(p) if (1..=100).contains(&p) => Some(Self::Percent(p)),
                _ => None,
            },
            None => match raw.parse::<u16>() {
                Ok(n) if n > 0 => Some(Self::Lines(n)),
                _ => None,
            },
        }
    }

    /// Requested height of the child given the parent's height, before clamping.
    pub fn rows(self, total: u16) -> u16 {
        match self {
            Self::Lines(n) => n,
            Self::Percent(p) => ((u32::from(total) * u32::from(p)) / 100) as u16,
        }
    }
}

impl TryFrom<String> for SplitHeight {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("invalid split height {raw:?}, expected N or N%"))
    }
}

impl fmt::Display for SplitHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lines(n) => write!(f, "{n}"),
            Self::Percent(p) => write!(f, "{p}%"),
        }
    }
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/repotui/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// `auto`, `vertical` or `horizontal`.
    #[serde(default)]
    pub split_mode: Option<SplitPreference>,

    /// Horizontal split height, `N` or `N%`.
    #[serde(default)]
    pub split_height: Option<SplitHeight>,

    /// Initial branch sort: `name`, `mru` or `state`.
    #[serde(default)]
    pub branch_sort: Option<String>,

    /// Diff context lines.
    #[serde(default)]
    pub diff_context: Option<usize>,

    /// Maximum number of versions blame examines.
    #[serde(default)]
    pub blame_limit: Option<usize>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Repository snapshot to open when `--repo` is not given.
    #[serde(default)]
    pub repository: Option<PathBuf>,

    /// Free-form settings read through [`Settings::get`].
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

/// Built-in values for [`Settings`] keys.
const SETTING_DEFAULTS: &[(&str, &str)] = &[
    ("date-format", "%Y-%m-%d"),
    ("show-ids", "off"),
];

/// Read-only settings lookup.
///
/// Precedence: the config file's `[settings]` table, then `REPOTUI_<KEY>` in the
/// environment (upper-cased, `-` becomes `_`), then the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    local: BTreeMap<String, String>,
}

impl Settings {
    /// Settings backed by a config file's table.
    pub fn new(local: BTreeMap<String, String>) -> Self {
        Self { local }
    }

    /// Value of `key`, if set anywhere.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.local.get(key) {
            return Some(value.clone());
        }
        if let Ok(value) = std::env::var(env_key(key)) {
            return Some(value);
        }
        SETTING_DEFAULTS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    }

    /// Boolean reading of `key` (`on`, `true`, `yes`, `1`).
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "on" | "true" | "yes" | "1"
            )
        })
    }
}

fn env_key(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.to_ascii_uppercase().replace(['-', '.'], "_"))
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Split placement for new views.
    pub split_mode: SplitPreference,
    /// Horizontal split height.
    pub split_height: SplitHeight,
    /// Initial branch sort order.
    pub branch_sort: BranchSort,
    /// Diff context lines.
    pub diff_context: usize,
    /// Blame version limit (`None` = unbounded).
    pub blame_limit: Option<usize>,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
    /// Repository snapshot location.
    pub repository: PathBuf,
    /// Free-form settings.
    pub settings: Settings,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            split_mode: SplitPreference::Auto,
            split_height: SplitHeight::default(),
            branch_sort: BranchSort::Name,
            diff_context: 5,
            blame_limit: None,
            log_file_path: default_log_path(),
            repository: PathBuf::from("repotui.json"),
            settings: Settings::default(),
        }
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/repotui/repotui.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("repotui").join("repotui.log")
    } else {
        PathBuf::from("repotui.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    if let Some(raw) = &config.branch_sort {
        if BranchSort::parse(raw).is_none() {
            return Err(ConfigError::ParseError {
                path,
                reason: format!("unknown branch_sort {raw:?}"),
            });
        }
    }

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/repotui/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("repotui").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `REPOTUI_CONFIG` environment variable
/// 3. Default path `~/.config/repotui/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var("REPOTUI_CONFIG") {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        split_mode: config.split_mode.unwrap_or(defaults.split_mode),
        split_height: config.split_height.unwrap_or(defaults.split_height),
        branch_sort: config
            .branch_sort
            .as_deref()
            .and_then(BranchSort::parse)
            .unwrap_or(defaults.branch_sort),
        diff_context: config.diff_context.unwrap_or(defaults.diff_context),
        blame_limit: config.blame_limit.or(defaults.blame_limit),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
        repository: config.repository.unwrap_or(defaults.repository),
        settings: Settings::new(config.settings),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Reads `REPOTUI_SPLIT_MODE`, `REPOTUI_SPLIT_HEIGHT`, `REPOTUI_BRANCH_SORT`,
/// `REPOTUI_DIFF_CONTEXT`, `REPOTUI_BLAME_LIMIT` and `REPOTUI_REPO`. Values that
/// do not parse are logged and ignored.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Some(mode) = env_value("SPLIT_MODE", SplitPreference::parse) {
        config.split_mode = mode;
    }
    if let Some(height) = env_value("SPLIT_HEIGHT", SplitHeight::parse) {
        config.split_height = height;
    }
    if let Some(sort) = env_value("BRANCH_SORT", BranchSort::parse) {
        config.branch_sort = sort;
    }
    if let Some(context) = env_value("DIFF_CONTEXT", |raw| raw.trim().parse::<usize>().ok()) {
        config.diff_context = context;
    }
    if let Some(limit) = env_value("BLAME_LIMIT", |raw| raw.trim().parse::<usize>().ok()) {
        config.blame_limit = Some(limit);
    }
    if let Ok(repo) = std::env::var(format!("{ENV_PREFIX}REPO")) {
        config.repository = PathBuf::from(repo);
    }
    config
}

fn env_value<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let var = format!("{ENV_PREFIX}{name}");
    let raw = std::env::var(&var).ok()?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(variable = %var, value = %raw, "ignoring invalid environment override");
    }
    parsed
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only applies overrides for flags that were explicitly set by the user.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    repository_override: Option<PathBuf>,
    branch_sort_override: Option<BranchSort>,
    blame_limit_override: Option<usize>,
) -> ResolvedConfig {
    if let Some(repository) = repository_override {
        config.repository = repository;
    }

    if let Some(sort) = branch_sort_override {
        config.branch_sort = sort;
    }

    if let Some(limit) = blame_limit_override {
        config.blame_limit = Some(limit);
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
