//! Span utilities for reload tracing.

use std::path::Path;

use tracing::{info_span, Span};

use crate::models::{ModelVersion, ReloadError, ReloadTrigger};

/// Extension trait for recording a reload outcome into its span.
pub trait SpanExt {
    fn record_result(&self, result: &Result<ModelVersion, ReloadError>);
}

impl SpanExt for Span {
    fn record_result(&self, result: &Result<ModelVersion, ReloadError>) {
        match result {
            Ok(version) => {
                self.record("status", "ok");
                self.record("version", version.to_string().as_str());
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.kind", e.kind());
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for the per-reload span.
pub struct ReloadSpan;

impl ReloadSpan {
    /// Fields `status`, `version`, `error.kind` and `error.message` start
    /// empty and are filled by [`SpanExt::record_result`]; the caller
    /// records `latency_ms`.
    pub fn new(trigger: ReloadTrigger, path: &Path) -> Span {
        info_span!(
            "model_reload",
            trigger = %trigger,
            path = %path.display(),
            status = tracing::field::Empty,
            version = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            error.kind = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}
