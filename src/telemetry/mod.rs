//! Telemetry for the reload path.
//!
//! Structured logging through `tracing`, one span per reload, and counters
//! through the `metrics` facade. No exporter is installed here; without a
//! recorder the metric calls are no-ops.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    record_reload_failure, record_reload_skipped, record_reload_success, record_watch_signal,
};
pub use spans::{ReloadSpan, SpanExt};
