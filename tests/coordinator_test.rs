//! Integration tests for ReloadCoordinator - serialized load/validate/publish.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use model_hotreload::config::WatchTarget;
use model_hotreload::models::{
    load_initial, ArtifactHandle, ArtifactLoader, LoadError, LoadedArtifact, ModelRegistry,
    ModelVersion, Provenance, ReloadCoordinator, ReloadError, ReloadStatus, ReloadTrigger,
};
use tempfile::TempDir;

/// Artifact format for these tests: the file holds a decimal tag.
fn tag_loader(path: &Path) -> Result<LoadedArtifact<u32>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;
    let model = text
        .trim()
        .parse::<u32>()
        .map_err(|e| LoadError::Corrupt(format!("bad tag: {}", e)))?;
    Ok(LoadedArtifact { model, features: vec!["x".to_string(), "y".to_string()] })
}

fn write_model(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("model.json");
    std::fs::write(&path, contents).unwrap();
    path
}

fn setup(dir: &TempDir, loader: Arc<dyn ArtifactLoader<u32>>) -> ReloadCoordinator<u32> {
    let target = WatchTarget::new(dir.path(), "model.json").with_enabled(false);
    let initial = load_initial(&target, loader.as_ref()).unwrap();
    ReloadCoordinator::new(target, loader, Arc::new(ModelRegistry::new(initial)))
}

/// Coordinator whose registry starts from a synthetic handle, so the
/// loader is only ever called by `reload`.
fn setup_without_initial_load(
    dir: &TempDir,
    loader: Arc<dyn ArtifactLoader<u32>>,
) -> ReloadCoordinator<u32> {
    let target = WatchTarget::new(dir.path(), "model.json").with_enabled(false);
    let modified = UNIX_EPOCH + Duration::from_secs(1);
    let initial = ArtifactHandle::new(
        0,
        vec!["x".to_string()],
        ModelVersion::from_modified(modified),
        Provenance { path: target.model_path(), size: 1, modified },
    );
    ReloadCoordinator::new(target, loader, Arc::new(ModelRegistry::new(initial)))
}

/// Loader that reports when it starts and then blocks until released.
struct GatedLoader {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl ArtifactLoader<u32> for GatedLoader {
    fn load(&self, path: &Path) -> Result<LoadedArtifact<u32>, LoadError> {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        tag_loader(path)
    }
}

fn gated() -> (Arc<GatedLoader>, mpsc::Receiver<()>, mpsc::Sender<()>) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let loader = Arc::new(GatedLoader {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    (loader, entered_rx, release_tx)
}

async fn wait_entered(entered: mpsc::Receiver<()>) -> mpsc::Receiver<()> {
    tokio::task::spawn_blocking(move || {
        entered.recv_timeout(Duration::from_secs(5)).unwrap();
        entered
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_manual_reload_publishes_new_artifact() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "1");
    let coordinator = setup(&dir, Arc::new(tag_loader));
    let before = coordinator.registry().version();

    write_model(&dir, "22");
    let version = coordinator.reload(ReloadTrigger::Manual).await.unwrap();

    let current = coordinator.registry().current();
    assert_eq!(*current.model(), 22);
    assert_eq!(current.version(), version);
    assert_eq!(current.source_size(), 2);
    assert!(version > before);

    let state = coordinator.state();
    assert_eq!(state.status, ReloadStatus::Idle);
    assert_eq!(state.attempts, 1);
    assert_eq!(state.failures, 0);
    assert!(state.last_success_at.is_some());
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_corrupt_artifact_keeps_last_known_good() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "1");
    let coordinator = setup(&dir, Arc::new(tag_loader));
    let good_version = coordinator.registry().version();

    write_model(&dir, "not a model");
    let err = coordinator.reload(ReloadTrigger::Watched).await.unwrap_err();

    assert!(matches!(err, ReloadError::CorruptArtifact(_)));
    assert_eq!(*coordinator.registry().current().model(), 1);
    assert_eq!(coordinator.registry().version(), good_version);
    assert_eq!(coordinator.registry().publish_count(), 0);

    let state = coordinator.state();
    assert_eq!(state.status, ReloadStatus::LoadFailed);
    assert_eq!(state.last_error, Some(err));
    assert_eq!(state.failures, 1);
    assert!(state.last_success_at.is_none());

    // A good artifact recovers and clears the error.
    write_model(&dir, "3");
    coordinator.reload(ReloadTrigger::Watched).await.unwrap();
    let state = coordinator.state();
    assert_eq!(state.status, ReloadStatus::Idle);
    assert!(state.last_error.is_none());
    assert_eq!(*coordinator.registry().current().model(), 3);
}

#[tokio::test]
async fn test_missing_and_empty_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(&dir, "1");
    let coordinator = setup(&dir, Arc::new(tag_loader));

    std::fs::remove_file(&path).unwrap();
    let err = coordinator.reload(ReloadTrigger::Manual).await.unwrap_err();
    assert_eq!(err, ReloadError::FileMissing(path.clone()));
    assert_eq!(err.kind(), "file_missing");

    write_model(&dir, "");
    let err = coordinator.reload(ReloadTrigger::Manual).await.unwrap_err();
    assert!(matches!(err, ReloadError::CorruptArtifact(_)));

    assert_eq!(*coordinator.registry().current().model(), 1);
    assert_eq!(coordinator.state().failures, 2);
}

#[tokio::test]
async fn test_invalid_feature_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "1");
    let coordinator = setup(&dir, Arc::new(tag_loader));

    let duplicate_features = |_: &Path| -> Result<LoadedArtifact<u32>, LoadError> {
        Ok(LoadedArtifact { model: 9, features: vec!["x".to_string(), "x".to_string()] })
    };
    let target = coordinator.target().clone();
    let err = load_initial(&target, &duplicate_features).unwrap_err();
    assert!(matches!(err, ReloadError::SchemaInvalid(_)));
}

#[tokio::test]
async fn test_versions_never_decrease() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "1");
    let coordinator = setup(&dir, Arc::new(tag_loader));

    let mut previous = coordinator.registry().version();
    for _ in 0..3 {
        // Unchanged file: same mtime, so the revision breaks the tie.
        let version = coordinator.reload(ReloadTrigger::Manual).await.unwrap();
        assert!(version > previous);
        assert!(version.to_string() > previous.to_string());
        previous = version;
    }
    assert_eq!(previous.revision(), 3);
}

#[tokio::test]
async fn test_older_file_still_gets_newer_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(&dir, "1");
    let coordinator = setup(&dir, Arc::new(tag_loader));
    let serving = coordinator.registry().version();

    // Restore an "older" artifact.
    write_model(&dir, "2");
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(1_000)).unwrap();
    drop(file);

    let version = coordinator.reload(ReloadTrigger::Manual).await.unwrap();
    assert!(version > serving);
    assert_eq!(version.timestamp(), serving.timestamp());
    assert_eq!(
        coordinator.registry().current().source_modified(),
        UNIX_EPOCH + Duration::from_secs(1_000)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_reload_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "5");
    let (loader, entered, release) = gated();
    let coordinator = setup_without_initial_load(&dir, loader);

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.reload(ReloadTrigger::Manual).await })
    };
    let _entered = wait_entered(entered).await;
    assert_eq!(coordinator.status(), ReloadStatus::Loading);

    // Rejected immediately while the first load is blocked.
    let second = tokio::time::timeout(
        Duration::from_secs(1),
        coordinator.reload(ReloadTrigger::Manual),
    )
    .await
    .expect("second reload must not wait");
    assert_eq!(second, Err(ReloadError::AlreadyInProgress));

    // Rejection touches neither the state nor the registry.
    let state = coordinator.state();
    assert_eq!(state.status, ReloadStatus::Loading);
    assert_eq!(state.attempts, 1);
    assert!(state.last_error.is_none());

    release.send(()).unwrap();
    let version = first.await.unwrap().unwrap();
    assert_eq!(coordinator.registry().version(), version);
    assert_eq!(*coordinator.registry().current().model(), 5);
    assert_eq!(coordinator.status(), ReloadStatus::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_burst_of_triggers_runs_one_load() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "6");
    let (loader, entered, release) = gated();
    let coordinator = setup_without_initial_load(&dir, loader);

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.reload(ReloadTrigger::Watched).await })
    };
    let entered = wait_entered(entered).await;

    let results = futures::future::join_all((0..8).map(|i| {
        let trigger = if i % 2 == 0 { ReloadTrigger::Manual } else { ReloadTrigger::Watched };
        let coordinator = coordinator.clone();
        async move { coordinator.reload(trigger).await }
    }))
    .await;
    assert!(results.iter().all(|r| *r == Err(ReloadError::AlreadyInProgress)));

    release.send(()).unwrap();
    first.await.unwrap().unwrap();
    assert_eq!(coordinator.registry().publish_count(), 1);
    assert_eq!(coordinator.state().attempts, 1);
    assert!(entered.try_recv().is_err(), "loader ran more than once");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reads_do_not_wait_for_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "5");
    let (loader, entered, release) = gated();
    let coordinator = setup_without_initial_load(&dir, loader);

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.reload(ReloadTrigger::Manual).await })
    };
    let _entered = wait_entered(entered).await;

    // Loader is blocked; readers still get the old generation.
    assert_eq!(*coordinator.registry().current().model(), 0);

    release.send(()).unwrap();
    first.await.unwrap().unwrap();
    assert_eq!(*coordinator.registry().current().model(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_caller_does_not_abandon_load() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "7");
    let (loader, entered, release) = gated();
    let coordinator = setup_without_initial_load(&dir, loader);

    let caller = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.reload(ReloadTrigger::Manual).await })
    };
    let _entered = wait_entered(entered).await;
    caller.abort();
    let _ = caller.await;

    release.send(()).unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while coordinator.status() == ReloadStatus::Loading {
        assert!(tokio::time::Instant::now() < deadline, "load never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(coordinator.status(), ReloadStatus::Idle);
    assert_eq!(*coordinator.registry().current().model(), 7);
}

#[tokio::test]
async fn test_loader_panic_releases_loading() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "4");
    let panicked = Arc::new(AtomicBool::new(false));
    let loader = {
        let panicked = Arc::clone(&panicked);
        move |path: &Path| -> Result<LoadedArtifact<u32>, LoadError> {
            if !panicked.swap(true, Ordering::SeqCst) {
                panic!("loader bug");
            }
            tag_loader(path)
        }
    };
    let coordinator = setup_without_initial_load(&dir, Arc::new(loader));

    let err = coordinator.reload(ReloadTrigger::Manual).await.unwrap_err();
    assert!(matches!(err, ReloadError::CorruptArtifact(_)));
    assert_eq!(coordinator.status(), ReloadStatus::LoadFailed);
    assert_eq!(*coordinator.registry().current().model(), 0);

    // Not stuck in Loading: the next attempt runs.
    coordinator.reload(ReloadTrigger::Manual).await.unwrap();
    assert_eq!(*coordinator.registry().current().model(), 4);
}

#[tokio::test]
async fn test_pending_change_survives_manual_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_model(&dir, "1");
    let coordinator = setup(&dir, Arc::new(tag_loader));

    coordinator.mark_pending();
    assert_eq!(coordinator.status(), ReloadStatus::PendingDebounce);
    let pending_since = coordinator.state().pending_since;
    assert!(pending_since.is_some());

    coordinator.reload(ReloadTrigger::Manual).await.unwrap();
    assert_eq!(coordinator.status(), ReloadStatus::PendingDebounce);
    assert_eq!(coordinator.state().pending_since, pending_since);

    coordinator.reload(ReloadTrigger::Watched).await.unwrap();
    assert_eq!(coordinator.status(), ReloadStatus::Idle);
    assert!(coordinator.state().pending_since.is_none());
}
