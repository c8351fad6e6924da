//! Immutable snapshot of one loaded model generation.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use super::version::ModelVersion;

/// Where a generation came from on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// One generation of a loaded model plus its metadata.
///
/// Fields are private and there are no setters: a new generation is always
/// a new handle. Shared between readers as `Arc<ArtifactHandle<M>>`.
#[derive(Debug)]
pub struct ArtifactHandle<M> {
    model: M,
    features: Vec<String>,
    version: ModelVersion,
    loaded_at: DateTime<Utc>,
    source: Provenance,
}

impl<M> ArtifactHandle<M> {
    pub fn new(
        model: M,
        features: Vec<String>,
        version: ModelVersion,
        source: Provenance,
    ) -> Self {
        Self {
            model,
            features,
            version,
            loaded_at: Utc::now(),
            source,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Feature names in the order the model expects them.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn version(&self) -> ModelVersion {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn source_path(&self) -> &Path {
        &self.source.path
    }

    pub fn source_size(&self) -> u64 {
        self.source.size
    }

    /// Raw mtime of the source file; may differ from the version timestamp
    /// when the version had to be clamped.
    pub fn source_modified(&self) -> SystemTime {
        self.source.modified
    }
}
