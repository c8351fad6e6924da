//! Service facade handed to the serving layer.
//!
//! Owns the registry, coordinator, optional watcher and status reporter for
//! one target file. Prediction handlers call [`ModelService::current_model`];
//! an admin endpoint calls [`ModelService::trigger_manual_reload`]; a
//! monitoring endpoint calls [`ModelService::status`].

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{EnvConfig, WatchTarget};
use crate::models::{
    load_initial, ArtifactHandle, ArtifactLoader, ModelRegistry, ModelVersion, ReloadCoordinator,
    ReloadError, ReloadTrigger,
};
use crate::status::{StatusInfo, StatusReporter};
use crate::watch::{ChangeWatcher, WatcherHandle};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Initial model load failed: {0}")]
    InitialLoad(#[from] ReloadError),

    #[error("Initial model load task failed: {0}")]
    Join(String),
}

pub struct ModelService<M> {
    registry: Arc<ModelRegistry<M>>,
    coordinator: ReloadCoordinator<M>,
    status: StatusReporter<M>,
    watcher: Option<WatcherHandle>,
    shutdown: CancellationToken,
}

impl<M: Send + Sync + 'static> ModelService<M> {
    /// Start from environment-derived configuration.
    pub async fn from_config(
        config: &EnvConfig,
        loader: Arc<dyn ArtifactLoader<M>>,
    ) -> Result<Self, StartupError> {
        Self::start(config.target.clone(), config.container_id.clone(), loader).await
    }

    /// Load the initial artifact, then start the watcher if enabled.
    ///
    /// Fails only when the initial load fails; there is nothing to serve
    /// yet. A watcher that cannot start is logged and the service runs
    /// with manual reloads only.
    pub async fn start(
        target: WatchTarget,
        container_id: impl Into<String>,
        loader: Arc<dyn ArtifactLoader<M>>,
    ) -> Result<Self, StartupError> {
        let initial = {
            let target = target.clone();
            let loader = Arc::clone(&loader);
            tokio::task::spawn_blocking(move || load_initial(&target, loader.as_ref()))
                .await
                .map_err(|e| StartupError::Join(e.to_string()))??
        };
        info!(
            version = %initial.version(),
            path = %initial.source_path().display(),
            size = initial.source_size(),
            features = initial.features().len(),
            "initial model loaded"
        );

        let registry = Arc::new(ModelRegistry::new(initial));
        let coordinator = ReloadCoordinator::new(target.clone(), loader, Arc::clone(&registry));
        let mut status = StatusReporter::new(coordinator.clone(), container_id);
        let shutdown = CancellationToken::new();

        let watcher = if target.enabled {
            match ChangeWatcher::new(coordinator.clone()).spawn(&shutdown) {
                Ok(handle) => {
                    status = status.with_watcher(handle.running_flag());
                    Some(handle)
                }
                Err(e) => {
                    error!(
                        container_id = status.container_id(),
                        error = %e,
                        "failed to start model file watcher; automatic reloads disabled"
                    );
                    None
                }
            }
        } else {
            info!(container_id = status.container_id(), "model file watcher disabled by configuration");
            None
        };

        Ok(Self { registry, coordinator, status, watcher, shutdown })
    }

    /// The artifact predictions should use right now.
    pub fn current_model(&self) -> Arc<ArtifactHandle<M>> {
        self.registry.current()
    }

    /// Reload on request. Fails fast with `AlreadyInProgress` when a load
    /// is running.
    pub async fn trigger_manual_reload(&self) -> Result<ModelVersion, ReloadError> {
        self.coordinator.reload(ReloadTrigger::Manual).await
    }

    pub fn status(&self) -> StatusInfo {
        self.status.snapshot()
    }

    pub fn registry(&self) -> &Arc<ModelRegistry<M>> {
        &self.registry
    }

    pub fn coordinator(&self) -> &ReloadCoordinator<M> {
        &self.coordinator
    }

    pub fn watcher_running(&self) -> bool {
        self.watcher.as_ref().map_or(false, WatcherHandle::is_running)
    }

    /// Stop the watcher (letting a running reload finish) and release
    /// background tasks.
    pub async fn shutdown(self) {
        if let Some(watcher) = self.watcher {
            watcher.stop().await;
        }
        self.shutdown.cancel();
    }
}
