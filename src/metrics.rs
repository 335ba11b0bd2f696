use metrics::{Counter, Histogram};
use std::time::Duration;

/// Counters for one orchestrator's lifetime.
///
/// Backed by the `metrics` facade; without an installed recorder these are
/// no-ops, so the core never pays for instrumentation it does not use.
#[derive(Clone)]
pub struct RunMetrics {
    pub screenshots_captured: Counter,
    pub captures_failed: Counter,
    pub bytes_written: Counter,
    pub capture_duration: Histogram,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            screenshots_captured: Counter::noop(),
            captures_failed: Counter::noop(),
            bytes_written: Counter::noop(),
            capture_duration: Histogram::noop(),
        }
    }

    pub fn record_capture(&self, duration: Duration, success: bool) {
        if success {
            self.screenshots_captured.increment(1);
        } else {
            self.captures_failed.increment(1);
        }
        self.capture_duration.record(duration.as_secs_f64());
    }

    pub fn record_bytes_written(&self, bytes: usize) {
        self.bytes_written.increment(bytes as u64);
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
