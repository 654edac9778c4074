//! Domain-level error taxonomy for the examiner.

/// Examiner domain errors.
///
/// `InvalidInput` is always caller-facing (HTTP 400). The model and rubric
/// variants are raised at or after the model-call stage and map to 500.
#[derive(Debug, thiserror::Error)]
pub enum ExaminerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model call failed: {0}")]
    ModelCallFailed(String),

    #[error("model output malformed: {0}")]
    ModelOutputMalformed(String),

    #[error("rubric unavailable: {0}")]
    RubricUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ExaminerError {
    /// True for errors produced before the model was contacted.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExaminerError::InvalidInput(_))
    }

    /// Stable machine-readable name of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExaminerError::InvalidInput(_) => "invalid_input",
            ExaminerError::ModelCallFailed(_) => "model_call_failed",
            ExaminerError::ModelOutputMalformed(_) => "model_output_malformed",
            ExaminerError::RubricUnavailable(_) => "rubric_unavailable",
            ExaminerError::Config(_) => "config",
        }
    }
}

/// Result type for examiner domain operations.
pub type Result<T> = std::result::Result<T, ExaminerError>;
