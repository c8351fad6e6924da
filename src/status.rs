//! Read-only status snapshot for monitoring.
//!
//! Combines the published artifact, the reload state, the live file on disk
//! and the process identity. Taking a snapshot never waits for a reload; an
//! in-progress load is reported as `loading`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::WatchMode;
use crate::models::{
    FileFingerprint, ModelRegistry, ModelVersion, ReloadCoordinator, ReloadStatus,
};

/// Point-in-time status of the reload subsystem.
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub watcher_enabled: bool,
    pub watcher_running: bool,
    pub container_id: String,
    pub watch_mode: WatchMode,
    pub debounce_secs: f64,
    pub model_directory: String,
    pub model_file_path: String,
    pub model_file_exists: bool,
    pub model_file_size: Option<u64>,
    pub model_file_modified: Option<DateTime<Utc>>,
    pub model_version: ModelVersion,
    pub loaded_at: DateTime<Utc>,
    pub source_path: String,
    pub source_size: u64,
    pub feature_count: usize,
    pub reload_status: ReloadStatus,
    pub last_error: Option<String>,
    pub last_error_kind: Option<&'static str>,
    pub pending_since: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub reload_attempts: u64,
    pub reload_failures: u64,
}

/// Builds [`StatusInfo`] snapshots.
pub struct StatusReporter<M> {
    registry: Arc<ModelRegistry<M>>,
    coordinator: ReloadCoordinator<M>,
    container_id: String,
    watcher_running: Option<Arc<AtomicBool>>,
}

impl<M: Send + Sync + 'static> StatusReporter<M> {
    pub fn new(coordinator: ReloadCoordinator<M>, container_id: impl Into<String>) -> Self {
        Self {
            registry: Arc::clone(coordinator.registry()),
            coordinator,
            container_id: container_id.into(),
            watcher_running: None,
        }
    }

    /// Report liveness of a started watcher.
    pub fn with_watcher(mut self, running: Arc<AtomicBool>) -> Self {
        self.watcher_running = Some(running);
        self
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn snapshot(&self) -> StatusInfo {
        let target = self.coordinator.target();
        let current = self.registry.current();
        let state = self.coordinator.state();
        let model_path = target.model_path();
        // A stat failure other than "missing" is reported as absent.
        let file = FileFingerprint::probe(&model_path).unwrap_or(FileFingerprint::Missing);

        StatusInfo {
            watcher_enabled: target.enabled,
            watcher_running: self
                .watcher_running
                .as_ref()
                .map_or(false, |flag| flag.load(Ordering::SeqCst)),
            container_id: self.container_id.clone(),
            watch_mode: target.mode,
            debounce_secs: target.debounce.as_secs_f64(),
            model_directory: target.directory.display().to_string(),
            model_file_path: model_path.display().to_string(),
            model_file_exists: file.exists(),
            model_file_size: file.size(),
            model_file_modified: file.modified().map(to_utc),
            model_version: current.version(),
            loaded_at: current.loaded_at(),
            source_path: current.source_path().display().to_string(),
            source_size: current.source_size(),
            feature_count: current.features().len(),
            reload_status: state.status,
            last_error: state.last_error.as_ref().map(|e| e.to_string()),
            last_error_kind: state.last_error.as_ref().map(|e| e.kind()),
            pending_since: state.pending_since,
            last_attempt_at: state.last_attempt_at,
            last_success_at: state.last_success_at,
            reload_attempts: state.attempts,
            reload_failures: state.failures,
        }
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
