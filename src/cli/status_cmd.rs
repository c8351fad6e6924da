// Copyright 2024-2026 model-hotreload Contributors
// SPDX-License-Identifier: Apache-2.0

//! One-shot status: load the configured artifact once and print the
//! snapshot a running server would report. No watcher is started.

use std::sync::Arc;

use crate::config::EnvConfig;
use crate::models::{load_initial, JsonModelLoader, ModelRegistry, ReloadCoordinator};
use crate::status::{StatusInfo, StatusReporter};

use super::{EXIT_CONFIG, EXIT_FAILURE, EXIT_OK};

/// Returns an exit code: 0 loaded, 1 output failed, 2 artifact unusable.
pub async fn run_status(config: &EnvConfig, json_output: bool) -> i32 {
    let loader = Arc::new(JsonModelLoader::new(config.features_filename.clone()));
    let target = config.target.clone();
    let initial = {
        let loader = Arc::clone(&loader);
        let target = target.clone();
        tokio::task::spawn_blocking(move || load_initial(&target, loader.as_ref())).await
    };
    let initial = match initial {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => {
            eprintln!("Model load failed ({}): {}", e.kind(), e);
            return EXIT_CONFIG;
        }
        Err(e) => {
            eprintln!("Model load task failed: {}", e);
            return EXIT_CONFIG;
        }
    };

    let registry = Arc::new(ModelRegistry::new(initial));
    let coordinator = ReloadCoordinator::new(target, loader, registry);
    let info = StatusReporter::new(coordinator, config.container_id.clone()).snapshot();

    if json_output {
        match serde_json::to_string_pretty(&info) {
            Ok(s) => {
                println!("{}", s);
                EXIT_OK
            }
            Err(e) => {
                eprintln!("Failed to serialize status: {}", e);
                EXIT_FAILURE
            }
        }
    } else {
        print_status(&info);
        EXIT_OK
    }
}

fn print_status(info: &StatusInfo) {
    println!("Container:        {}", info.container_id);
    println!("Watcher enabled:  {} ({}, debounce {}s)", info.watcher_enabled, info.watch_mode, info.debounce_secs);
    println!("Model file:       {}", info.model_file_path);
    match (info.model_file_size, info.model_file_modified) {
        (Some(size), Some(modified)) => {
            println!("  size:           {} bytes", size);
            println!("  modified:       {}", modified.to_rfc3339());
        }
        _ => println!("  (missing)"),
    }
    println!("Model version:    {}", info.model_version);
    println!("Loaded at:        {}", info.loaded_at.to_rfc3339());
    println!("Features:         {}", info.feature_count);
    println!("Reload status:    {:?}", info.reload_status);
    if let Some(err) = &info.last_error {
        println!("Last error:       {}", err);
    }
}
