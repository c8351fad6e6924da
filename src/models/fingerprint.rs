//! Cheap file identity used for change detection and diagnostics.

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Existence, size and modification time of a file at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFingerprint {
    Missing,
    Present { size: u64, modified: SystemTime },
}

impl FileFingerprint {
    /// Stat `path`. A missing file is a fingerprint, not an error.
    pub fn probe(path: &Path) -> io::Result<Self> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(Self::Present {
                size: meta.len(),
                modified: meta.modified()?,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::Missing),
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            Self::Present { size, .. } => Some(*size),
            Self::Missing => None,
        }
    }

    pub fn modified(&self) -> Option<SystemTime> {
        match self {
            Self::Present { modified, .. } => Some(*modified),
            Self::Missing => None,
        }
    }
}
