//! Sortable version tokens derived from artifact modification times.
//!
//! A version is the source file's mtime plus a revision counter. The counter
//! breaks ties when two loads observe the same mtime, and keeps the sequence
//! monotonic when an older file is copied back into place.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

/// Version of one published artifact generation.
///
/// Ordering compares the timestamp first, then the revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelVersion {
    secs: u64,
    nanos: u32,
    revision: u32,
}

impl ModelVersion {
    /// Version for a file modified at `modified`, with no revision suffix.
    ///
    /// Times before the Unix epoch collapse to zero.
    pub fn from_modified(modified: SystemTime) -> Self {
        let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            secs: since_epoch.as_secs(),
            nanos: since_epoch.subsec_nanos(),
            revision: 0,
        }
    }

    /// Smallest version that is both derived from `self` and strictly
    /// greater than `previous`.
    ///
    /// Returns `self` unchanged when its timestamp is already newer. When the
    /// timestamps collide, or the new one is older, the previous timestamp is
    /// kept and its revision bumped.
    pub fn succeeding(self, previous: ModelVersion) -> Self {
        if self.timestamp() > previous.timestamp() {
            return self;
        }
        Self {
            secs: previous.secs,
            nanos: previous.nanos,
            revision: previous.revision.saturating_add(1),
        }
    }

    /// `(seconds, nanoseconds)` since the Unix epoch.
    pub fn timestamp(&self) -> (u64, u32) {
        (self.secs, self.nanos)
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Modification time this version was derived from, as seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + f64::from(self.nanos) / 1e9
    }
}

impl fmt::Display for ModelVersion {
    // Fixed-width fields keep the string form lexicographically sortable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012}.{:09}", self.secs, self.nanos)?;
        if self.revision > 0 {
            write!(f, "-r{:06}", self.revision)?;
        }
        Ok(())
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
