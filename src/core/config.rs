//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CleanerError, Result};
use crate::core::paths::{default_watch_dir, home_dir, resolve_absolute_path};
use crate::scanner::timestamps::TimestampSource;

/// Full tempclean configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub watch: WatchConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// What to watch and how entry names are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory whose immediate children are candidates.
    pub directory: PathBuf,
    /// Literal, case-sensitive name prefix marking a self-destructing entry.
    pub prefix: String,
    /// Which filesystem timestamp the expiration is counted from.
    pub timestamp_source: TimestampSource,
}

/// Loop cadence and deletion behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between cycle starts (fixed delay after each cycle).
    pub scan_interval_secs: f64,
    /// Report expired entries without removing them.
    pub dry_run: bool,
}

/// Activity log settings. Console output is always on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub jsonl_enabled: bool,
    pub jsonl_log: PathBuf,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

/// Filesystem paths used by tempclean itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: default_watch_dir(),
            prefix: "temp".to_string(),
            timestamp_source: TimestampSource::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 60.0,
            dry_run: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_enabled: false,
            jsonl_log: home_dir()
                .join(".local")
                .join("share")
                .join("tempclean")
                .join("activity.jsonl"),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: home_dir()
                .join(".config")
                .join("tempclean")
                .join("config.toml"),
        }
    }
}

impl ScheduleConfig {
    /// The configured interval as a `Duration`. Call only on validated config.
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.scan_interval_secs).unwrap_or(Duration::from_secs(60))
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// `load` with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let cfg = Self::load_unvalidated_with(path, lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read file and env without validating, so callers can layer CLI
    /// overrides first and validate the final result once.
    pub fn load_unvalidated(path: Option<&Path>) -> Result<Self> {
        Self::load_unvalidated_with(path, env_var)
    }

    /// `load_unvalidated` with an injectable environment lookup.
    pub fn load_unvalidated_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|e| CleanerError::io(&path_buf, e))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(CleanerError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.normalize_paths();
        Ok(cfg)
    }

    /// Render the effective config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic hash of the effective config for the start event.
    ///
    /// FNV-1a over the canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("TEMPCLEAN_WATCH_DIRECTORY") {
            self.watch.directory = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("TEMPCLEAN_WATCH_PREFIX") {
            self.watch.prefix = raw;
        }
        if let Some(raw) = lookup("TEMPCLEAN_TIMESTAMP_SOURCE") {
            self.watch.timestamp_source = raw.parse().map_err(|details| {
                CleanerError::ConfigParse {
                    context: "env",
                    details: format!("TEMPCLEAN_TIMESTAMP_SOURCE={raw:?}: {details}"),
                }
            })?;
        }
        if let Some(raw) = lookup("TEMPCLEAN_SCAN_INTERVAL_SECS") {
            self.schedule.scan_interval_secs = parse_env("TEMPCLEAN_SCAN_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("TEMPCLEAN_DRY_RUN") {
            self.schedule.dry_run = parse_env("TEMPCLEAN_DRY_RUN", &raw)?;
        }
        if let Some(raw) = lookup("TEMPCLEAN_JSONL_ENABLED") {
            self.logging.jsonl_enabled = parse_env("TEMPCLEAN_JSONL_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("TEMPCLEAN_JSONL_LOG") {
            self.logging.jsonl_log = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Expand `~` and make configured paths absolute.
    pub fn normalize_paths(&mut self) {
        self.watch.directory = resolve_absolute_path(&self.watch.directory);
        self.logging.jsonl_log = resolve_absolute_path(&self.logging.jsonl_log);
    }

    /// Check invariants that the loop relies on.
    pub fn validate(&self) -> Result<()> {
        let interval = self.schedule.scan_interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(CleanerError::InvalidConfig {
                details: format!("schedule.scan_interval_secs must be > 0, got {interval}"),
            });
        }
        if Duration::try_from_secs_f64(interval).is_err() {
            return Err(CleanerError::InvalidConfig {
                details: format!("schedule.scan_interval_secs out of range: {interval}"),
            });
        }

        validate_prefix(&self.watch.prefix)?;

        if self.logging.max_size_bytes == 0 || self.logging.max_rotated_files == 0 {
            return Err(CleanerError::InvalidConfig {
                details: "logging.max_size_bytes and logging.max_rotated_files must be > 0"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// A prefix must be non-empty and a single path component.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(CleanerError::InvalidConfig {
            details: "watch.prefix must not be empty".to_string(),
        });
    }
    if prefix.contains(['/', '\\']) {
        return Err(CleanerError::InvalidConfig {
            details: format!("watch.prefix must not contain path separators: {prefix:?}"),
        });
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| CleanerError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
