//! Runtime configuration loading from environment variables.
//!
//! Values are read once at process start. Invalid values fall back to
//! defaults without crashing; durations have floors so a typo cannot turn
//! the watcher into a busy loop.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `MODEL_WATCHDOG_ENABLED` | true | Start the background watcher (`true`/`1`/`yes`) |
//! | `MODEL_RELOAD_DEBOUNCE` | 1.0 | Debounce window (seconds, fractional allowed) |
//! | `MODEL_DIR` | model | Directory holding the artifact |
//! | `MODEL_FILENAME` | model.json | Artifact filename inside `MODEL_DIR` |
//! | `MODEL_FEATURES_FILENAME` | model_features.json | Feature list next to the artifact |
//! | `MODEL_WATCH_MODE` | native | `native` (OS notifications) or `poll` |
//! | `MODEL_POLL_INTERVAL_MS` | 500 | Poll period when `MODEL_WATCH_MODE=poll` |
//! | `HOSTNAME` | system hostname | Container identity reported in status |
//! | `MODEL_LOG_FORMAT` | json | `json` or `pretty` |
//! | `MODEL_LOG_FILE` | (stderr) | Append JSON logs to this file instead |
//! | `RUST_LOG` | info | Log filter |

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::models::DEFAULT_FEATURES_FILENAME;
use crate::telemetry::{LogConfig, LogFormat};

pub const DEFAULT_MODEL_DIR: &str = "model";
pub const DEFAULT_MODEL_FILENAME: &str = "model.json";
pub const DEFAULT_DEBOUNCE_SECS: f64 = 1.0;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

const MIN_DEBOUNCE: Duration = Duration::from_millis(10);
const MIN_POLL_INTERVAL_MS: u64 = 50;

/// How the watcher learns that the artifact may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// OS-native notifications (inotify, FSEvents, ReadDirectoryChangesW).
    Native,
    /// Periodic stat of size and mtime.
    Poll,
}

impl WatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Poll => "poll",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" | "notify" => Some(Self::Native),
            "poll" | "polling" => Some(Self::Poll),
            _ => None,
        }
    }
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one file this process watches and reloads.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchTarget {
    pub directory: PathBuf,
    pub filename: String,
    pub debounce: Duration,
    pub enabled: bool,
    pub mode: WatchMode,
    pub poll_interval: Duration,
}

impl WatchTarget {
    pub fn new(directory: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
            debounce: Duration::from_secs_f64(DEFAULT_DEBOUNCE_SECS),
            enabled: true,
            mode: WatchMode::Native,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_mode(mut self, mode: WatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn model_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    /// Whether `path` names the target file, judged by filename only so that
    /// relative and canonical directory spellings both match.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name().map_or(false, |name| name == self.filename.as_str())
    }
}

/// Effective configuration summary for `config show`.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub watchdog_enabled: bool,
    pub debounce_secs: f64,
    pub model_dir: String,
    pub model_filename: String,
    pub features_filename: String,
    pub watch_mode: WatchMode,
    pub poll_interval_ms: u64,
    pub container_id: String,
    pub log_format: LogFormat,
    pub log_level: String,
    pub log_file: Option<String>,
}

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub target: WatchTarget,
    pub features_filename: String,
    pub container_id: String,
    pub log: LogConfig,
}

/// Parse a boolean flag. Missing uses `default`; anything present but not
/// `true`/`1`/`yes` is false.
fn parse_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

/// Parse an `f64` env var, returning `default` on missing, invalid or
/// non-finite input.
fn parse_f64(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Non-empty string env var or `default`.
fn parse_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn load_debounce() -> Duration {
    let secs = parse_f64("MODEL_RELOAD_DEBOUNCE", DEFAULT_DEBOUNCE_SECS).max(0.0);
    Duration::try_from_secs_f64(secs)
        .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_DEBOUNCE_SECS))
        .max(MIN_DEBOUNCE)
}

fn load_watch_mode() -> WatchMode {
    std::env::var("MODEL_WATCH_MODE")
        .ok()
        .and_then(|v| WatchMode::parse(&v))
        .unwrap_or(WatchMode::Native)
}

fn load_target() -> WatchTarget {
    let poll_ms = parse_u64("MODEL_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS).max(MIN_POLL_INTERVAL_MS);
    WatchTarget::new(
        parse_string("MODEL_DIR", DEFAULT_MODEL_DIR),
        parse_string("MODEL_FILENAME", DEFAULT_MODEL_FILENAME),
    )
    .with_enabled(parse_flag("MODEL_WATCHDOG_ENABLED", true))
    .with_debounce(load_debounce())
    .with_mode(load_watch_mode())
    .with_poll_interval(Duration::from_millis(poll_ms))
}

fn load_log_config() -> LogConfig {
    let format = match std::env::var("MODEL_LOG_FORMAT") {
        Ok(v) if v.trim().eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
        _ => LogFormat::Json,
    };
    let output_path = std::env::var("MODEL_LOG_FILE")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    LogConfig {
        format,
        level: parse_string("RUST_LOG", "info"),
        output_path,
    }
}

/// Identity string reported in status: `HOSTNAME` (set by container
/// runtimes), then the OS hostname, then `unknown`.
pub fn container_identity() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Load all configuration from environment variables.
pub fn load() -> EnvConfig {
    EnvConfig {
        target: load_target(),
        features_filename: parse_string("MODEL_FEATURES_FILENAME", DEFAULT_FEATURES_FILENAME),
        container_id: container_identity(),
        log: load_log_config(),
    }
}

impl EnvConfig {
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            watchdog_enabled: self.target.enabled,
            debounce_secs: self.target.debounce.as_secs_f64(),
            model_dir: self.target.directory.display().to_string(),
            model_filename: self.target.filename.clone(),
            features_filename: self.features_filename.clone(),
            watch_mode: self.target.mode,
            poll_interval_ms: self.target.poll_interval.as_millis() as u64,
            container_id: self.container_id.clone(),
            log_format: self.log.format,
            log_level: self.log.level.clone(),
            log_file: self.log.output_path.as_ref().map(|p| p.display().to_string()),
        }
    }
}
