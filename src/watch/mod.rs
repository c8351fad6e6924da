//! Background watcher that turns file changes into debounced reloads.
//!
//! `Idle → PendingDebounce → Loading → Idle`. A change signal while pending
//! re-arms the timer; a settled window triggers exactly one watched reload.
//! Reload failures are recorded by the coordinator and not retried; the
//! next real change is the next attempt.

mod debounce;
mod source;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchMode;
use crate::models::{ReloadCoordinator, ReloadError, ReloadTrigger};
use debounce::{run_debounced, ChangeSignal, Settle};
use source::{start_native, start_polling, SignalSource};

/// Signals buffered between the source and the debounce loop.
const SIGNAL_BUFFER: usize = 64;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher disabled by configuration")]
    Disabled,

    #[error("Watch directory does not exist: {0}")]
    DirectoryMissing(PathBuf),

    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Drives a [`ReloadCoordinator`] from changes to its target file.
pub struct ChangeWatcher<M> {
    coordinator: ReloadCoordinator<M>,
}

impl<M: Send + Sync + 'static> ChangeWatcher<M> {
    pub fn new(coordinator: ReloadCoordinator<M>) -> Self {
        Self { coordinator }
    }

    /// Start the signal source and the debounce task.
    ///
    /// Must be called from within a tokio runtime. The watcher stops when
    /// `shutdown` (or the returned handle) is cancelled.
    pub fn spawn(self, shutdown: &CancellationToken) -> Result<WatcherHandle, WatchError> {
        let target = self.coordinator.target().clone();
        if !target.enabled {
            return Err(WatchError::Disabled);
        }
        if !target.directory.is_dir() {
            return Err(WatchError::DirectoryMissing(target.directory.clone()));
        }
        if !target.model_path().exists() {
            warn!(path = %target.model_path().display(), "model file does not exist yet; watching for its creation");
        }

        let shutdown = shutdown.child_token();
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        let source = match target.mode {
            WatchMode::Native => SignalSource::Native(start_native(&target, tx)?),
            WatchMode::Poll => SignalSource::Polling(start_polling(&target, tx, shutdown.clone())),
        };

        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(watch_loop(
            self.coordinator,
            rx,
            source,
            shutdown.clone(),
            Arc::clone(&running),
        ));

        info!(
            directory = %target.directory.display(),
            filename = %target.filename,
            mode = %target.mode,
            debounce_secs = target.debounce.as_secs_f64(),
            "started model file watcher"
        );
        Ok(WatcherHandle { task, shutdown, running })
    }
}

async fn watch_loop<M: Send + Sync + 'static>(
    coordinator: ReloadCoordinator<M>,
    mut rx: mpsc::Receiver<ChangeSignal>,
    source: SignalSource,
    shutdown: CancellationToken,
    running: Arc<AtomicBool>,
) {
    let window = coordinator.target().debounce;

    run_debounced(
        &mut rx,
        window,
        &shutdown,
        || {
            debug!("model file change detected; debouncing");
            coordinator.mark_pending();
        },
        || {
            let coordinator = coordinator.clone();
            async move {
                match coordinator.reload(ReloadTrigger::Watched).await {
                    // A manual reload was running and may have read the file
                    // before this change landed.
                    Err(ReloadError::AlreadyInProgress) => Settle::Rearm,
                    // Outcome already logged and recorded by the coordinator.
                    Ok(_) | Err(_) => Settle::Done,
                }
            }
        },
    )
    .await;

    drop(source);
    running.store(false, Ordering::SeqCst);
    info!("model file watcher stopped");
}

/// Owner's handle on a running watcher.
pub struct WatcherHandle {
    task: JoinHandle<()>,
    shutdown: CancellationToken,
    running: Arc<AtomicBool>,
}

impl WatcherHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared flag that flips to false when the watch loop exits.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stop the watcher and wait for its task. A reload already running
    /// finishes first.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "model file watcher task ended abnormally");
        }
    }
}
