//! Single-slot registry holding the currently served artifact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::artifact::ArtifactHandle;
use super::version::ModelVersion;

/// Holds exactly one current [`ArtifactHandle`].
///
/// Reads are a lock-free pointer load and never wait on a reload. A publish
/// swaps the pointer in one step, so readers see the old generation or the
/// new one and nothing in between. Handles captured before a swap stay valid
/// until their last `Arc` is dropped.
pub struct ModelRegistry<M> {
    current: ArcSwap<ArtifactHandle<M>>,
    publishes: AtomicU64,
}

impl<M> ModelRegistry<M> {
    pub fn new(initial: ArtifactHandle<M>) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            publishes: AtomicU64::new(0),
        }
    }

    /// The currently published handle.
    pub fn current(&self) -> Arc<ArtifactHandle<M>> {
        self.current.load_full()
    }

    /// Version of the current handle without cloning the `Arc`.
    pub fn version(&self) -> ModelVersion {
        self.current.load().version()
    }

    /// Atomically replace the current handle. Returns the displaced one.
    pub fn publish(&self, handle: ArtifactHandle<M>) -> Arc<ArtifactHandle<M>> {
        let previous = self.current.swap(Arc::new(handle));
        self.publishes.fetch_add(1, Ordering::Relaxed);
        previous
    }

    /// Number of publishes since construction (the initial handle is not one).
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }
}
