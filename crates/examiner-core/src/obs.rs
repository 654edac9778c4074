//! Structured observability hooks for the evaluation lifecycle.
//!
//! This module provides:
//! - A request-scoped tracing span via [`evaluation_span`]
//! - Emission functions for lifecycle events: start, stage transition,
//!   finish, failure
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use tracing::info;

use crate::evaluator::EvaluationStage;

/// Span carrying the request id for one evaluation.
///
/// The pipeline awaits inside it, so attach it with
/// [`tracing::Instrument::instrument`] rather than entering it.
///
/// # Example
///
/// ```ignore
/// async { /* emit events */ }.instrument(evaluation_span(&request_id)).await
/// ```
pub fn evaluation_span(request_id: &str) -> tracing::Span {
    tracing::info_span!("examiner.evaluation", request_id = %request_id)
}

/// Emit event: evaluation started for an input kind.
pub fn emit_evaluation_started(request_id: &str, input_kind: &str) {
    info!(event = "evaluation.started", request_id = %request_id, input = %input_kind);
}

/// Emit event: the request moved to `stage`.
pub fn emit_stage(request_id: &str, stage: EvaluationStage) {
    info!(event = "evaluation.stage", request_id = %request_id, stage = %stage);
}

/// Emit event: evaluation finished with its overall band.
pub fn emit_evaluation_finished(request_id: &str, duration_ms: u64, overall_band: f64, word_count: u64) {
    info!(
        event = "evaluation.finished",
        request_id = %request_id,
        duration_ms = duration_ms,
        overall_band = overall_band,
        word_count = word_count,
    );
}

/// Emit event: evaluation failed (warning level).
pub fn emit_evaluation_failed(request_id: &str, kind: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(
        event = "evaluation.failed",
        request_id = %request_id,
        kind = %kind,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_span_create() {
        let span = evaluation_span("test-request-id");
        let _entered = span.enter();
        emit_stage("test-request-id", EvaluationStage::Received);
    }
}
