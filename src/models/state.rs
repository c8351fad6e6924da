//! Process-local bookkeeping for the reload path.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::coordinator::ReloadError;

/// What asked for a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadTrigger {
    Manual,
    Watched,
}

impl ReloadTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Watched => "watched",
        }
    }
}

impl fmt::Display for ReloadTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadStatus {
    Idle,
    PendingDebounce,
    Loading,
    LoadFailed,
}

/// Mutable reload state, guarded by the coordinator.
#[derive(Debug, Clone)]
pub struct ReloadState {
    pub status: ReloadStatus,
    /// Cleared by the next successful load.
    pub last_error: Option<ReloadError>,
    pub pending_since: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub attempts: u64,
    pub failures: u64,
}

impl Default for ReloadState {
    fn default() -> Self {
        Self {
            status: ReloadStatus::Idle,
            last_error: None,
            pending_since: None,
            last_attempt_at: None,
            last_success_at: None,
            attempts: 0,
            failures: 0,
        }
    }
}
