//! Model Hot-Reload Runtime
//!
//! Serves one model artifact from disk and swaps in new generations while
//! requests keep flowing.
//!
//! # Design Principles
//!
//! - **Non-blocking reads**: the current model is a lock-free pointer load
//! - **Atomic publish**: readers see the old generation or the new one, never a mix
//! - **Debounced**: a burst of writes to the artifact becomes one reload
//! - **Last-known-good**: a failed reload never leaves the process without a model
//!
//! # Multiple Containers
//!
//! Each process watches the shared file on its own and converges on its own
//! schedule. There is no cross-process lock or version consensus; during a
//! rollout, instances behind one load balancer may briefly serve different
//! versions.
//!
//! # Wiring
//!
//! ```no_run
//! use std::sync::Arc;
//! use model_hotreload::config;
//! use model_hotreload::models::JsonModelLoader;
//! use model_hotreload::ModelService;
//!
//! # async fn run() -> Result<(), model_hotreload::StartupError> {
//! let cfg = config::load();
//! let service = ModelService::from_config(&cfg, Arc::new(JsonModelLoader::new(&cfg.features_filename))).await?;
//!
//! let model = service.current_model();
//! let _ = model.model().predict(&vec![0.0; model.features().len()]);
//! let _ = service.trigger_manual_reload().await;
//! println!("{}", serde_json::to_string(&service.status()).unwrap_or_default());
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod models;
pub mod service;
pub mod status;
pub mod telemetry;
pub mod watch;

pub use models::{ArtifactHandle, ModelRegistry, ModelVersion, ReloadCoordinator, ReloadError};
pub use service::{ModelService, StartupError};
pub use status::{StatusInfo, StatusReporter};
pub use watch::{ChangeWatcher, WatchError, WatcherHandle};
