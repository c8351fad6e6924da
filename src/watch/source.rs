//! Where change signals come from: OS notifications or stat polling.
//!
//! Neither source is trusted to describe the change precisely. Editors and
//! deploy scripts produce in-place writes, create+rename pairs and metadata
//! touches in platform-specific orders; all of them just mean "look again".

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::debounce::ChangeSignal;
use super::WatchError;
use crate::config::{WatchMode, WatchTarget};
use crate::models::FileFingerprint;
use crate::telemetry;

/// Keeps the active source alive for as long as the watcher runs.
pub(crate) enum SignalSource {
    Native(RecommendedWatcher),
    Polling(JoinHandle<()>),
}

/// Whether a notify event may have changed the target file.
///
/// Creation, content or metadata modification, and a rename *onto* the
/// target qualify. Removal, access and a rename *away* from the target do not.
/// Backends that report renames without a direction (FSEvents, Windows)
/// qualify only while the target exists.
pub(crate) fn is_target_event(target: &WatchTarget, event: &Event) -> bool {
    match &event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => false,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().map_or(false, |p| target.matches(p))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().any(|p| target.matches(p)) && target.model_path().exists()
        }
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any => {
            event.paths.iter().any(|p| target.matches(p))
        }
        _ => false,
    }
}

/// Forward a signal without blocking. A full buffer already holds a pending
/// signal, so dropping this one loses nothing.
fn forward(tx: &mpsc::Sender<ChangeSignal>) -> bool {
    !matches!(tx.try_send(ChangeSignal), Err(TrySendError::Closed(_)))
}

/// Watch the target directory (non-recursively) with the platform backend.
pub(crate) fn start_native(
    target: &WatchTarget,
    tx: mpsc::Sender<ChangeSignal>,
) -> Result<RecommendedWatcher, WatchError> {
    let filter = target.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_target_event(&filter, &event) {
                debug!(kind = ?event.kind, paths = ?event.paths, "model file change signal");
                telemetry::record_watch_signal(WatchMode::Native);
                forward(&tx);
            }
        }
        Err(e) => warn!(error = %e, "file watcher error"),
    })?;

    watcher.watch(&target.directory, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Stat the target every `poll_interval` and signal when its fingerprint
/// changes to a present file. A disappearing file is not a signal; its
/// return is.
pub(crate) fn start_polling(
    target: &WatchTarget,
    tx: mpsc::Sender<ChangeSignal>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let path = target.model_path();
    let period = target.poll_interval;

    tokio::spawn(async move {
        let mut last = FileFingerprint::probe(&path).ok();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let current = match FileFingerprint::probe(&path) {
                Ok(fp) => Some(fp),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "poll stat failed");
                    None
                }
            };
            if current == last {
                continue;
            }
            let present = matches!(current, Some(fp) if fp.exists());
            last = current;

            if present {
                debug!(path = %path.display(), "model file fingerprint changed");
                telemetry::record_watch_signal(WatchMode::Poll);
                if !forward(&tx) {
                    break;
                }
            }
        }
    })
}
