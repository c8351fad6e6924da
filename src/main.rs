//! model-hotreload entry point.
//!
//! Serves one model artifact and keeps it current:
//! - Configuration loading from the environment
//! - Initial artifact load (fail-fast)
//! - File watcher with debounced reloads
//! - Signal handling for manual reload and graceful shutdown
//!
//! ## CLI Subcommands
//!
//! - `model-hotreload` or `model-hotreload serve` - Run the reload service (default)
//! - `model-hotreload status [--json]` - Load once and print status
//! - `model-hotreload config show|defaults|validate` - Inspect configuration

use std::process::ExitCode;
use std::sync::Arc;

use model_hotreload::cli::{self, config_cmd, run_status, EXIT_CONFIG};
use model_hotreload::config::{self as model_config, EnvConfig};
use model_hotreload::models::{JsonModelLoader, LinearModel, ReloadError};
use model_hotreload::telemetry::init_logging;
use model_hotreload::ModelService;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "serve" | "" => {
            let config = model_config::load();
            if let Err(e) = init_logging(&config.log) {
                eprintln!("Logging setup failed: {}", e);
                return ExitCode::from(EXIT_CONFIG as u8);
            }
            ExitCode::from(serve(config).await as u8)
        }
        "status" => {
            let config = model_config::load();
            let json_output = args.get(2).map(|s| s.as_str()) == Some("--json");
            let code = run_status(&config, json_output).await;
            ExitCode::from(code as u8)
        }
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => {
                    config_cmd::run_show();
                    ExitCode::SUCCESS
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => {
                    let code = config_cmd::run_validate();
                    ExitCode::from(code as u8)
                }
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("model-hotreload {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: EnvConfig) -> i32 {
    let loader = Arc::new(JsonModelLoader::new(config.features_filename.clone()));
    let service: ModelService<LinearModel> = match ModelService::from_config(&config, loader).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("Startup failed: {}", e);
            return EXIT_CONFIG;
        }
    };

    let current = service.current_model();
    info!(
        container_id = %config.container_id,
        version = %current.version(),
        features = current.features().len(),
        watcher_running = service.watcher_running(),
        "model service ready"
    );

    if let Err(e) = wait_for_shutdown(&service).await {
        warn!(error = %e, "signal handling failed; shutting down");
    }

    info!("shutdown signal received, stopping watcher");
    service.shutdown().await;
    info!("shutdown complete");
    cli::EXIT_OK
}

/// Block until Ctrl+C or SIGTERM. SIGHUP triggers a manual reload.
#[cfg(unix)]
async fn wait_for_shutdown(service: &ModelService<LinearModel>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => return res,
            _ = terminate.recv() => return Ok(()),
            _ = hangup.recv() => manual_reload(service).await,
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_service: &ModelService<LinearModel>) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(unix)]
async fn manual_reload(service: &ModelService<LinearModel>) {
    info!("SIGHUP received, reloading model");
    match service.trigger_manual_reload().await {
        Ok(version) => info!(version = %version, "manual reload complete"),
        Err(ReloadError::AlreadyInProgress) => info!("reload already in progress; SIGHUP ignored"),
        // Already logged by the coordinator.
        Err(_) => {}
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "model-hotreload - Live model artifact reloading v{}

USAGE:
    model-hotreload [COMMAND] [OPTIONS]

COMMANDS:
    serve        Load the model and watch it for changes (default)
    status       Load the model once and print status
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    model-hotreload                      # Run the service (default)
    model-hotreload status --json        # Status as JSON
    model-hotreload config validate      # Check configured paths
    kill -HUP <pid>                      # Reload without waiting for a file change

ENVIRONMENT:
    MODEL_WATCHDOG_ENABLED   Watch the model file (default: true)
    MODEL_RELOAD_DEBOUNCE    Quiet period in seconds before reloading (default: 1.0)
    MODEL_DIR                Directory holding the artifact (default: model)
    MODEL_FILENAME           Artifact file name (default: model.json)
    MODEL_FEATURES_FILENAME  Feature list file name (default: model_features.json)
    MODEL_WATCH_MODE         native or poll (default: native)
    MODEL_POLL_INTERVAL_MS   Poll interval in poll mode (default: 500)
    MODEL_LOG_FORMAT         json or pretty (default: json)
    MODEL_LOG_FILE           Append JSON logs to this file (default: stderr)
    RUST_LOG                 Log filter (default: info)
    HOSTNAME                 Container identity reported in status

EXIT CODES:
    0  Success
    1  Failure
    2  Configuration or initial load error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "serve" => {
            eprintln!(
                "model-hotreload serve - Run the reload service

USAGE:
    model-hotreload serve

DESCRIPTION:
    Loads the configured model artifact, then watches its directory and
    reloads after writes settle. A failed reload keeps serving the last
    good model. Send SIGHUP to reload immediately; SIGINT or SIGTERM to
    stop.

    Exits with code 2 if the initial load fails.
"
            );
        }
        "status" => {
            eprintln!(
                "model-hotreload status - Show status

USAGE:
    model-hotreload status [--json]

DESCRIPTION:
    Loads the configured artifact once (no watcher) and prints the
    status snapshot: file on disk, loaded version, feature count and
    reload state.

EXIT CODES:
    0  Artifact loaded
    1  Output failed
    2  Artifact could not be loaded
"
            );
        }
        "config" => {
            eprintln!(
                "model-hotreload config - Inspect configuration

USAGE:
    model-hotreload config <SUBCOMMAND>

SUBCOMMANDS:
    show           Show effective configuration
    defaults       Show default configuration
    validate       Check the model directory and files exist

EXAMPLES:
    model-hotreload config show
    MODEL_DIR=/srv/model model-hotreload config validate
"
            );
        }
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'model-hotreload help' for general usage.",
                command
            );
        }
    }
}
