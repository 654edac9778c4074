//! Band Examiner Core Library
//!
//! Rubric catalog, system-prompt compilation, band scoring and the
//! evaluation pipeline that sits between an essay submission and an
//! external language model.

pub mod band;
pub mod domain;
pub mod evaluator;
pub mod llm;
pub mod metrics;
pub mod obs;
pub mod parser;
pub mod prompt;
pub mod telemetry;

pub use band::{overall_band, round_to_band, MAX_BAND, MIN_BAND};

pub use domain::{
    word_count, Band, BandScores, Criterion, EssayInput, EssaySubmission, EvaluationResult,
    ExaminerError, FeedbackMap, ImageUpload, ModelAssessment, ModelScores, Result,
    RubricCatalog, ScoreSummary, SubScores,
};

pub use evaluator::{EvaluationRequestHandler, EvaluationStage, ErrorPolicy, EvaluatorOptions};

pub use llm::{
    FakeModelClient, ModelClient, ModelContent, ModelReply, ModelRequest, OpenAiClient,
    OpenAiConfig, OutputMode,
};

pub use parser::{strip_code_fences, ResponseParser};

pub use prompt::{
    compile_system_prompt, prompt_digest, response_json_schema, SystemPrompt, PROMPT_VERSION,
    RUBRIC_UNAVAILABLE,
};

pub use metrics::METRICS;
pub use obs::{
    emit_evaluation_failed, emit_evaluation_finished, emit_evaluation_started, emit_stage,
    evaluation_span,
};
pub use telemetry::init_tracing;

/// Examiner version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
