//! Configuration: defaults, TOML overrides, and the field-wise merge.
//!
//! A [`Config`] is built once per run by laying a [`PartialConfig`] over the
//! defaults and is never mutated afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::llm::Provider;

/// Braille spinner frames used when the config does not provide its own.
pub const DEFAULT_SPINNER_FRAMES: [&str; 10] =
    ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert software engineer who writes clear, \
concise git commit messages. You only ever answer with the commit message itself.";

pub const DEFAULT_PROMPT: &str = "Write a git commit message for the staged changes below.

Rules:
- Follow Conventional Commits: `type(scope): description`
- Type: one of feat, fix, build, chore, ci, docs, style, refactor, perf, test
- Subject line at most 50 characters, imperative mood, no trailing period
- For non-trivial changes add a body after a blank line explaining WHY, wrapped at 72 characters
- Reply with the commit message only, no explanation and no code fences

```diff
{diff}
```";

/// How the success notification reports the estimated cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostDisplay {
    Off,
    #[default]
    Compact,
    Verbose,
}

impl CostDisplay {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostDisplay::Off => "off",
            CostDisplay::Compact => "compact",
            CostDisplay::Verbose => "verbose",
        }
    }
}

impl fmt::Display for CostDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostDisplay {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(CostDisplay::Off),
            "compact" => Ok(CostDisplay::Compact),
            "verbose" => Ok(CostDisplay::Verbose),
            _ => Err(ConfigError::UnknownCostDisplay(s.to_string())),
        }
    }
}

/// Spinner setting as written in the config file.
///
/// `spinner_frames = false` disables the spinner, `true` restores the default
/// frames, and a list replaces them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SpinnerSetting {
    Toggle(bool),
    Frames(Vec<String>),
}

impl SpinnerSetting {
    fn into_frames(self) -> Option<Vec<String>> {
        match self {
            SpinnerSetting::Toggle(false) => None,
            SpinnerSetting::Toggle(true) => Some(default_frames()),
            SpinnerSetting::Frames(frames) => Some(frames),
        }
    }
}

fn default_frames() -> Vec<String> {
    DEFAULT_SPINNER_FRAMES.iter().map(|s| s.to_string()).collect()
}

/// Fully resolved configuration for one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub provider: Provider,
    pub model: String,
    pub temperature: f64,
    /// Prompt template. `{diff}` marks where the diff goes; without it the
    /// diff is appended after a blank line.
    pub prompt: String,
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    /// Only sent to models that accept it.
    pub reasoning_effort: Option<String>,
    pub notifications: bool,
    /// `None` disables the spinner.
    pub spinner_frames: Option<Vec<String>>,
    pub cost_display: CostDisplay,
    /// Unified diff context lines (`git diff -U<n>`).
    pub context_lines: Option<u32>,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Copilot,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            prompt: DEFAULT_PROMPT.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: None,
            reasoning_effort: None,
            notifications: true,
            spinner_frames: Some(default_frames()),
            cost_display: CostDisplay::default(),
            context_lines: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Lay user overrides over the defaults, field by field.
    pub fn setup(partial: PartialConfig) -> Self {
        let defaults = Self::default();
        Self {
            provider: partial.provider.unwrap_or(defaults.provider),
            model: partial.model.unwrap_or(defaults.model),
            temperature: partial.temperature.unwrap_or(defaults.temperature),
            prompt: partial.prompt.unwrap_or(defaults.prompt),
            system_prompt: partial.system_prompt.unwrap_or(defaults.system_prompt),
            max_tokens: partial.max_tokens.or(defaults.max_tokens),
            reasoning_effort: partial.reasoning_effort.or(defaults.reasoning_effort),
            notifications: partial.notifications.unwrap_or(defaults.notifications),
            spinner_frames: match partial.spinner_frames {
                Some(setting) => setting.into_frames(),
                None => defaults.spinner_frames,
            },
            cost_display: partial.cost_display.unwrap_or(defaults.cost_display),
            context_lines: partial.context_lines.or(defaults.context_lines),
            http_timeout_secs: partial
                .http_timeout_secs
                .unwrap_or(defaults.http_timeout_secs),
        }
    }

    /// Whether an animated spinner should run for this configuration.
    pub fn spinner_enabled(&self) -> bool {
        self.notifications
            && self
                .spinner_frames
                .as_ref()
                .is_some_and(|frames| !frames.is_empty())
    }
}

/// User overrides; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub prompt: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub reasoning_effort: Option<String>,
    pub notifications: Option<bool>,
    pub spinner_frames: Option<SpinnerSetting>,
    pub cost_display: Option<CostDisplay>,
    pub context_lines: Option<u32>,
    pub http_timeout_secs: Option<u64>,
}

impl PartialConfig {
    /// Parse overrides from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load overrides from an explicit path. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load overrides from the default location, treating a missing file as
    /// "no overrides".
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.is_file() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Combine two override sets; fields present in `overrides` win.
    pub fn merge(self, overrides: PartialConfig) -> PartialConfig {
        PartialConfig {
            provider: overrides.provider.or(self.provider),
            model: overrides.model.or(self.model),
            temperature: overrides.temperature.or(self.temperature),
            prompt: overrides.prompt.or(self.prompt),
            system_prompt: overrides.system_prompt.or(self.system_prompt),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            reasoning_effort: overrides.reasoning_effort.or(self.reasoning_effort),
            notifications: overrides.notifications.or(self.notifications),
            spinner_frames: overrides.spinner_frames.or(self.spinner_frames),
            cost_display: overrides.cost_display.or(self.cost_display),
            context_lines: overrides.context_lines.or(self.context_lines),
            http_timeout_secs: overrides.http_timeout_secs.or(self.http_timeout_secs),
        }
    }
}

/// `<config_dir>/gitscribe/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gitscribe").join("config.toml"))
}
