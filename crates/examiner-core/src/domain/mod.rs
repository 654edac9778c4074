//! Domain models for the examiner.
//!
//! Canonical definitions for the core entities:
//! - `RubricCatalog`: Immutable table of criteria and banded exemplars
//! - `EssayInput`: A validated essay submission (text or images)
//! - `EvaluationResult`: The per-request evaluation record

pub mod error;
pub mod evaluation;
pub mod input;
pub mod rubric;

// Re-export main types and errors
pub use error::{ExaminerError, Result};
pub use evaluation::{
    word_count, BandScores, EvaluationResult, FeedbackMap, ModelAssessment, ModelScores,
    ScoreSummary, SubScores,
};
pub use input::{EssayInput, EssaySubmission, ImageUpload};
pub use rubric::{Band, Criterion, RubricCatalog};
