//! Reload counters and latency histograms via the `metrics` facade.

use crate::config::WatchMode;
use crate::models::ReloadTrigger;

/// A reload published a new generation.
pub fn record_reload_success(trigger: ReloadTrigger, latency_ms: f64) {
    metrics::counter!("model_reload_total", "trigger" => trigger.as_str(), "outcome" => "success")
        .increment(1);
    metrics::histogram!("model_reload_latency_ms", "trigger" => trigger.as_str()).record(latency_ms);
}

/// A reload ran and failed; the previous generation is still served.
pub fn record_reload_failure(trigger: ReloadTrigger, kind: &'static str) {
    metrics::counter!("model_reload_total", "trigger" => trigger.as_str(), "outcome" => "failure")
        .increment(1);
    metrics::counter!("model_reload_failures_total", "trigger" => trigger.as_str(), "kind" => kind)
        .increment(1);
}

/// A reload was rejected because another one was running.
pub fn record_reload_skipped(trigger: ReloadTrigger) {
    metrics::counter!("model_reload_total", "trigger" => trigger.as_str(), "outcome" => "skipped")
        .increment(1);
}

/// The watcher saw a qualifying change signal (before debouncing).
pub fn record_watch_signal(mode: WatchMode) {
    metrics::counter!("model_watch_signals_total", "mode" => mode.as_str()).increment(1);
}
