//! Model artifact management.
//!
//! Handles artifact loading, the single-slot registry, version tokens and
//! the serialized reload path.

mod artifact;
mod coordinator;
mod fingerprint;
mod loader;
mod registry;
mod state;
mod version;

pub use artifact::{ArtifactHandle, Provenance};
pub use coordinator::{load_initial, ReloadCoordinator, ReloadError};
pub use fingerprint::FileFingerprint;
pub use loader::{
    ArtifactLoader, JsonModelLoader, LinearModel, LoadError, LoadedArtifact,
    DEFAULT_FEATURES_FILENAME,
};
pub use registry::ModelRegistry;
pub use state::{ReloadState, ReloadStatus, ReloadTrigger};
pub use version::ModelVersion;
