//! Global atomic counters for examiner observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. on daemon shutdown).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters: no allocations, no locking.
pub struct Metrics {
    evaluations_requested: AtomicU64,
    evaluations_failed: AtomicU64,
    model_calls: AtomicU64,
    malformed_outputs: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            evaluations_requested: AtomicU64::new(0),
            evaluations_failed: AtomicU64::new(0),
            model_calls: AtomicU64::new(0),
            malformed_outputs: AtomicU64::new(0),
        }
    }

    pub fn inc_evaluations_requested(&self) {
        self.evaluations_requested.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_requested", "counter incremented");
    }

    pub fn inc_evaluations_failed(&self) {
        self.evaluations_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_failed", "counter incremented");
    }

    pub fn inc_model_calls(&self) {
        self.model_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "model_calls", "counter incremented");
    }

    pub fn inc_malformed_outputs(&self) {
        self.malformed_outputs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "malformed_outputs", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            evaluations_requested = self.evaluations_requested(),
            evaluations_failed = self.evaluations_failed(),
            model_calls = self.model_calls(),
            malformed_outputs = self.malformed_outputs(),
        );
    }

    pub fn evaluations_requested(&self) -> u64 {
        self.evaluations_requested.load(Ordering::Relaxed)
    }

    pub fn evaluations_failed(&self) -> u64 {
        self.evaluations_failed.load(Ordering::Relaxed)
    }

    pub fn model_calls(&self) -> u64 {
        self.model_calls.load(Ordering::Relaxed)
    }

    pub fn malformed_outputs(&self) -> u64 {
        self.malformed_outputs.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.evaluations_requested.store(0, Ordering::Relaxed);
        self.evaluations_failed.store(0, Ordering::Relaxed);
        self.model_calls.store(0, Ordering::Relaxed);
        self.malformed_outputs.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.evaluations_requested(), 0);
        m.inc_evaluations_requested();
        m.inc_evaluations_requested();
        assert_eq!(m.evaluations_requested(), 2);

        m.inc_model_calls();
        assert_eq!(m.model_calls(), 1);

        m.inc_evaluations_failed();
        m.inc_malformed_outputs();
        assert_eq!(m.evaluations_failed(), 1);
        assert_eq!(m.malformed_outputs(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_evaluations_requested();
        m.inc_evaluations_failed();
        m.inc_model_calls();
        m.inc_malformed_outputs();
        m.reset();
        assert_eq!(m.evaluations_requested(), 0);
        assert_eq!(m.evaluations_failed(), 0);
        assert_eq!(m.model_calls(), 0);
        assert_eq!(m.malformed_outputs(), 0);
    }
}
