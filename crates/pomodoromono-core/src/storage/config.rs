//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Duration presets and the preset a session starts with
//! - Tick cadence period
//! - Progress animation window and frame period
//!
//! Configuration is stored at `~/.config/pomodoromono/config.toml`.
//! Timer state itself is never written here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::timer::{DEFAULT_MINUTES, DEFAULT_PRESETS, MAX_MINUTES, MIN_MINUTES};

/// Countdown configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_presets")]
    pub presets: Vec<u32>,
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,
    /// Cadence period; one tick decrements one second of countdown.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
}

/// Progress indicator animation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_frame_period_ms")]
    pub frame_period_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pomodoromono/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

// Default functions
fn default_presets() -> Vec<u32> {
    DEFAULT_PRESETS.to_vec()
}
fn default_minutes() -> u32 {
    DEFAULT_MINUTES
}
fn default_tick_period_ms() -> u64 {
    1000
}
fn default_window_ms() -> u64 {
    520
}
fn default_frame_period_ms() -> u64 {
    16
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            presets: default_presets(),
            default_minutes: default_minutes(),
            tick_period_ms: default_tick_period_ms(),
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            frame_period_ms: default_frame_period_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|e| invalid(e.to_string()))?,
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load and validate a config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The caller decides whether to save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the timer cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let in_range = |m: u32| (MIN_MINUTES..=MAX_MINUTES).contains(&m);
        if self.timer.presets.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "timer.presets".into(),
                message: "at least one preset is required".into(),
            });
        }
        if let Some(bad) = self.timer.presets.iter().find(|m| !in_range(**m)) {
            return Err(ConfigError::InvalidValue {
                key: "timer.presets".into(),
                message: format!("{bad} is outside {MIN_MINUTES}..={MAX_MINUTES}"),
            });
        }
        if !in_range(self.timer.default_minutes) {
            return Err(ConfigError::InvalidValue {
                key: "timer.default_minutes".into(),
                message: format!(
                    "{} is outside {MIN_MINUTES}..={MAX_MINUTES}",
                    self.timer.default_minutes
                ),
            });
        }
        for (key, value) in [
            ("timer.tick_period_ms", self.timer.tick_period_ms),
            ("animation.frame_period_ms", self.animation.frame_period_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "period must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.timer.tick_period_ms)
    }

    pub fn animation_window(&self) -> Duration {
        Duration::from_millis(self.animation.window_ms)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.animation.frame_period_ms)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
