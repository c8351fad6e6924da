//! Load → validate → publish, one at a time.
//!
//! The coordinator is the only writer of the [`ModelRegistry`]. A reload that
//! finds another one running fails fast with [`ReloadError::AlreadyInProgress`]
//! instead of queueing. Deserialization runs on the blocking pool with no
//! registry lock held; only the final pointer swap touches the registry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use super::artifact::{ArtifactHandle, Provenance};
use super::fingerprint::FileFingerprint;
use super::loader::{ArtifactLoader, LoadError};
use super::registry::ModelRegistry;
use super::state::{ReloadState, ReloadStatus, ReloadTrigger};
use super::version::ModelVersion;
use crate::config::WatchTarget;
use crate::telemetry::{self, ReloadSpan, SpanExt};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReloadError {
    #[error("Model file not found: {0}")]
    FileMissing(PathBuf),

    #[error("Corrupt model artifact: {0}")]
    CorruptArtifact(String),

    #[error("Invalid feature schema: {0}")]
    SchemaInvalid(String),

    #[error("Reload already in progress")]
    AlreadyInProgress,

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

impl ReloadError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileMissing(_) => "file_missing",
            Self::CorruptArtifact(_) => "corrupt_artifact",
            Self::SchemaInvalid(_) => "schema_invalid",
            Self::AlreadyInProgress => "already_in_progress",
            Self::PermissionDenied(_) => "permission_denied",
        }
    }
}

impl From<LoadError> for ReloadError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(path) => Self::FileMissing(path),
            LoadError::PermissionDenied(path) => Self::PermissionDenied(path),
            LoadError::Corrupt(msg) => Self::CorruptArtifact(msg),
            LoadError::Schema(msg) => Self::SchemaInvalid(msg),
            LoadError::Io(e) => Self::CorruptArtifact(format!("unreadable artifact: {}", e)),
        }
    }
}

struct Shared<M> {
    target: WatchTarget,
    loader: Arc<dyn ArtifactLoader<M>>,
    registry: Arc<ModelRegistry<M>>,
    state: Mutex<ReloadState>,
}

/// Serializes reloads of one target into one registry.
///
/// Cheap to clone; clones share state.
pub struct ReloadCoordinator<M> {
    shared: Arc<Shared<M>>,
}

impl<M> Clone for ReloadCoordinator<M> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<M: Send + Sync + 'static> ReloadCoordinator<M> {
    pub fn new(
        target: WatchTarget,
        loader: Arc<dyn ArtifactLoader<M>>,
        registry: Arc<ModelRegistry<M>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                target,
                loader,
                registry,
                state: Mutex::new(ReloadState::default()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry<M>> {
        &self.shared.registry
    }

    pub fn target(&self) -> &WatchTarget {
        &self.shared.target
    }

    /// Copy of the current reload state.
    pub fn state(&self) -> ReloadState {
        self.shared.state.lock().clone()
    }

    pub fn status(&self) -> ReloadStatus {
        self.shared.state.lock().status
    }

    /// Record that a change was seen and is waiting out the debounce window.
    ///
    /// A running load keeps reporting `Loading`; the pending timestamp is
    /// still noted so the state returns to `PendingDebounce` afterwards.
    pub fn mark_pending(&self) {
        let mut state = self.shared.state.lock();
        if state.pending_since.is_none() {
            state.pending_since = Some(Utc::now());
        }
        if state.status != ReloadStatus::Loading {
            state.status = ReloadStatus::PendingDebounce;
        }
    }

    /// Load the target, validate it and publish it.
    ///
    /// Returns the published version. On failure the previous handle stays
    /// current. Once started, the load runs to completion even if the
    /// returned future is dropped.
    pub async fn reload(&self, trigger: ReloadTrigger) -> Result<ModelVersion, ReloadError> {
        let guard = match self.try_begin(trigger) {
            Ok(guard) => guard,
            Err(e) => {
                debug!(%trigger, "reload skipped: another load is running");
                telemetry::record_reload_skipped(trigger);
                return Err(e);
            }
        };

        let shared = Arc::clone(&self.shared);
        let task = tokio::task::spawn_blocking(move || {
            let path = shared.target.model_path();
            let span = ReloadSpan::new(trigger, &path);
            let _entered = span.enter();

            let started = Instant::now();
            let previous = shared.registry.version();
            let result = load_handle(shared.loader.as_ref(), &path, Some(previous)).map(|handle| {
                let version = handle.version();
                shared.registry.publish(handle);
                version
            });

            span.record("latency_ms", started.elapsed().as_secs_f64() * 1000.0);
            span.record_result(&result);
            guard.settle(&result, previous);
            result
        });

        match task.await {
            Ok(result) => result,
            // The guard already marked the state failed.
            Err(e) => Err(join_failure(&e)),
        }
    }

    fn try_begin(&self, trigger: ReloadTrigger) -> Result<LoadingGuard<M>, ReloadError> {
        let mut state = self.shared.state.lock();
        if state.status == ReloadStatus::Loading {
            return Err(ReloadError::AlreadyInProgress);
        }
        state.status = ReloadStatus::Loading;
        state.last_attempt_at = Some(Utc::now());
        state.attempts += 1;
        if trigger == ReloadTrigger::Watched {
            state.pending_since = None;
        }
        Ok(LoadingGuard {
            shared: Arc::clone(&self.shared),
            trigger,
            started: Instant::now(),
            settled: false,
        })
    }
}

/// Holds `Loading` for exactly one reload; releasing it is not optional.
struct LoadingGuard<M> {
    shared: Arc<Shared<M>>,
    trigger: ReloadTrigger,
    started: Instant,
    settled: bool,
}

impl<M> LoadingGuard<M> {
    fn settle(mut self, result: &Result<ModelVersion, ReloadError>, previous: ModelVersion) {
        let latency_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        {
            let mut state = self.shared.state.lock();
            match result {
                Ok(_) => {
                    state.status = if state.pending_since.is_some() {
                        ReloadStatus::PendingDebounce
                    } else {
                        ReloadStatus::Idle
                    };
                    state.last_error = None;
                    state.last_success_at = Some(Utc::now());
                }
                Err(e) => {
                    state.status = ReloadStatus::LoadFailed;
                    state.last_error = Some(e.clone());
                    state.failures += 1;
                }
            }
        }
        self.settled = true;

        let trigger = self.trigger;
        match result {
            Ok(version) => {
                info!(%trigger, old_version = %previous, new_version = %version, latency_ms, "model reloaded");
                telemetry::record_reload_success(trigger, latency_ms);
            }
            Err(e) => {
                if trigger == ReloadTrigger::Watched {
                    error!(%trigger, kind = e.kind(), error = %e, serving_version = %previous, "model reload failed");
                } else {
                    warn!(%trigger, kind = e.kind(), error = %e, serving_version = %previous, "model reload failed");
                }
                telemetry::record_reload_failure(trigger, e.kind());
            }
        }
    }
}

impl<M> Drop for LoadingGuard<M> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.shared.state.lock();
        state.status = ReloadStatus::LoadFailed;
        state.failures += 1;
        state.last_error = Some(ReloadError::CorruptArtifact(
            "reload aborted before completion".to_string(),
        ));
    }
}

/// A blocking load that never returned: the loader panicked, or the runtime
/// shut down before the task ran.
fn join_failure(err: &JoinError) -> ReloadError {
    if err.is_panic() {
        ReloadError::CorruptArtifact(format!("loader panicked: {}", err))
    } else {
        ReloadError::CorruptArtifact(format!("reload cancelled: {}", err))
    }
}

/// First load at startup, before any registry exists.
pub fn load_initial<M>(
    target: &WatchTarget,
    loader: &dyn ArtifactLoader<M>,
) -> Result<ArtifactHandle<M>, ReloadError> {
    load_handle(loader, &target.model_path(), None)
}

fn load_handle<M>(
    loader: &dyn ArtifactLoader<M>,
    path: &Path,
    previous: Option<ModelVersion>,
) -> Result<ArtifactHandle<M>, ReloadError> {
    let (size, modified) = match FileFingerprint::probe(path) {
        Ok(FileFingerprint::Present { size, modified }) => (size, modified),
        Ok(FileFingerprint::Missing) => return Err(ReloadError::FileMissing(path.to_path_buf())),
        Err(e) => return Err(LoadError::from_io(path, e).into()),
    };
    if size == 0 {
        return Err(ReloadError::CorruptArtifact(format!("{} is empty", path.display())));
    }

    let loaded = loader.load(path)?;
    validate_features(&loaded.features)?;

    let mut version = ModelVersion::from_modified(modified);
    if let Some(previous) = previous {
        if version.timestamp() < previous.timestamp() {
            warn!(
                path = %path.display(),
                file_version = %version,
                serving_version = %previous,
                "artifact mtime moved backwards; keeping version monotonic"
            );
        }
        version = version.succeeding(previous);
    }

    Ok(ArtifactHandle::new(
        loaded.model,
        loaded.features,
        version,
        Provenance { path: path.to_path_buf(), size, modified },
    ))
}

fn validate_features(features: &[String]) -> Result<(), ReloadError> {
    if features.is_empty() {
        return Err(ReloadError::SchemaInvalid("feature list is empty".to_string()));
    }
    let mut seen = HashSet::with_capacity(features.len());
    for (idx, name) in features.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ReloadError::SchemaInvalid(format!("feature {} has a blank name", idx)));
        }
        if !seen.insert(name.as_str()) {
            return Err(ReloadError::SchemaInvalid(format!("duplicate feature: {}", name)));
        }
    }
    Ok(())
}
