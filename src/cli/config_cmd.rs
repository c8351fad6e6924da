// Copyright 2024-2026 model-hotreload Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! These read configuration directly from environment variables and never
//! load the model.

use crate::config::{
    self, EffectiveConfig, EnvConfig, DEFAULT_DEBOUNCE_SECS, DEFAULT_MODEL_DIR,
    DEFAULT_MODEL_FILENAME, DEFAULT_POLL_INTERVAL_MS,
};
use crate::models::DEFAULT_FEATURES_FILENAME;

use super::{EXIT_FAILURE, EXIT_OK};

/// Print effective config as key-value pairs to stdout.
pub fn run_show() {
    let cfg = config::load().effective_config();
    print_config(&cfg);
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    println!("MODEL_WATCHDOG_ENABLED=true");
    println!("MODEL_RELOAD_DEBOUNCE={:.1}", DEFAULT_DEBOUNCE_SECS);
    println!("MODEL_DIR={}", DEFAULT_MODEL_DIR);
    println!("MODEL_FILENAME={}", DEFAULT_MODEL_FILENAME);
    println!("MODEL_FEATURES_FILENAME={}", DEFAULT_FEATURES_FILENAME);
    println!("MODEL_WATCH_MODE=native");
    println!("MODEL_POLL_INTERVAL_MS={}", DEFAULT_POLL_INTERVAL_MS);
    println!("MODEL_LOG_FORMAT=json");
    println!("MODEL_LOG_FILE=");
    println!("RUST_LOG=info");
}

/// Check the configured paths exist.
///
/// Returns 0 if valid, 1 if any warnings are found.
pub fn run_validate() -> i32 {
    let warnings = validate(&config::load());
    for w in &warnings {
        eprintln!("WARNING: {}", w);
    }
    if warnings.is_empty() {
        println!("Configuration is valid.");
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

/// Human-readable problems with `env`. Empty means valid.
pub fn validate(env: &EnvConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let target = &env.target;

    if !target.directory.is_dir() {
        warnings.push(format!(
            "MODEL_DIR ({}) is not a directory; the watcher cannot start",
            target.directory.display()
        ));
    } else {
        let model_path = target.model_path();
        if !model_path.is_file() {
            warnings.push(format!("model file {} does not exist", model_path.display()));
        }
        let features_path = target.directory.join(&env.features_filename);
        if !features_path.is_file() {
            warnings.push(format!("feature list {} does not exist", features_path.display()));
        }
    }

    if env.container_id == "unknown" {
        warnings.push("container identity could not be determined; set HOSTNAME".to_string());
    }

    warnings
}

fn print_config(cfg: &EffectiveConfig) {
    println!("MODEL_WATCHDOG_ENABLED={}", cfg.watchdog_enabled);
    println!("MODEL_RELOAD_DEBOUNCE={}", cfg.debounce_secs);
    println!("MODEL_DIR={}", cfg.model_dir);
    println!("MODEL_FILENAME={}", cfg.model_filename);
    println!("MODEL_FEATURES_FILENAME={}", cfg.features_filename);
    println!("MODEL_WATCH_MODE={}", cfg.watch_mode);
    println!("MODEL_POLL_INTERVAL_MS={}", cfg.poll_interval_ms);
    println!("MODEL_LOG_FORMAT={}", cfg.log_format);
    println!("MODEL_LOG_FILE={}", cfg.log_file.as_deref().unwrap_or(""));
    println!("RUST_LOG={}", cfg.log_level);
    println!("HOSTNAME={}", cfg.container_id);
}
