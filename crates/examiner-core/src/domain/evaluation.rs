//! Evaluation records: the per-request result returned to callers and the
//! loosely-typed assessment parsed out of the model's reply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::band::overall_band;
use crate::domain::error::Result;

/// Criterion key → band score (0.0–9.0 in 0.5 steps by convention).
pub type SubScores = BTreeMap<String, f64>;

/// Criterion key → free-text explanation.
pub type FeedbackMap = BTreeMap<String, String>;

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Sub-scores plus the derived overall band.
///
/// Serialized flat, matching the schema the model is asked to produce:
/// `{"task_response": 7.0, ..., "overall_band": 7.0}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BandScores {
    #[serde(flatten)]
    pub sub_scores: SubScores,
    pub overall_band: f64,
}

/// The unified evaluation record returned for every request.
///
/// Constructed once per request and never mutated afterwards; serialized
/// directly into the HTTP response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub topic: String,
    pub word_count: u64,
    pub scores: BandScores,
    pub feedback: FeedbackMap,
    pub suggestions: Vec<String>,
    pub original_essay: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationResult {
    /// Build a result from essay text, computing word count and overall band
    /// locally.
    pub fn from_essay(
        essay_text: &str,
        topic: impl Into<String>,
        sub_scores: SubScores,
        feedback: FeedbackMap,
        suggestions: Vec<String>,
    ) -> Result<Self> {
        let overall = overall_band(&sub_scores)?;
        Ok(Self {
            topic: topic.into(),
            word_count: word_count(essay_text),
            scores: BandScores {
                sub_scores,
                overall_band: overall,
            },
            feedback,
            suggestions,
            original_essay: essay_text.to_string(),
            error: None,
        })
    }

    /// An error-shaped result: empty maps, empty strings, `error` populated.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn overall_band(&self) -> f64 {
        self.scores.overall_band
    }
}

/// Compact response for the JSON `{"essay": ...}` endpoint variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreSummary {
    /// Sub-scores plus `overall_band`.
    pub scores: BTreeMap<String, f64>,
    pub feedback: FeedbackMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&EvaluationResult> for ScoreSummary {
    fn from(result: &EvaluationResult) -> Self {
        let mut scores = result.scores.sub_scores.clone();
        if result.error.is_none() {
            scores.insert("overall_band".to_string(), result.scores.overall_band);
        }
        Self {
            scores,
            feedback: result.feedback.clone(),
            error: result.error.clone(),
        }
    }
}

/// Scores block as returned by the model. `overall_band` may be absent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModelScores {
    #[serde(default)]
    pub overall_band: Option<f64>,
    #[serde(flatten)]
    pub sub_scores: SubScores,
}

/// The assessment payload the model produces, before local post-processing.
///
/// Every field except `scores` is optional so that a partially-filled reply
/// still parses; `scores` is validated against the rubric afterwards.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModelAssessment {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub word_count: Option<f64>,
    #[serde(alias = "score")]
    pub scores: ModelScores,
    #[serde(default)]
    pub feedback: FeedbackMap,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub original_essay: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scores() -> SubScores {
        SubScores::from([
            ("task_response".to_string(), 7.0),
            ("coherence_and_cohesion".to_string(), 6.5),
            ("lexical_resource".to_string(), 7.5),
            ("grammatical_range_and_accuracy".to_string(), 6.0),
        ])
    }

    #[test]
    fn test_word_count_from_essay_text() {
        let result = EvaluationResult::from_essay(
            "one two three",
            "topic",
            sample_scores(),
            FeedbackMap::new(),
            vec![],
        )
        .expect("valid scores");
        assert_eq!(result.word_count, 3);
        assert_eq!(result.original_essay, "one two three");
    }

    #[test]
    fn test_word_count_collapses_whitespace() {
        assert_eq!(word_count("  one\ttwo\n\nthree   four "), 4);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_from_essay_computes_overall_band() {
        // avg = 6.75 -> rounds up
        let result = EvaluationResult::from_essay(
            "essay",
            "topic",
            sample_scores(),
            FeedbackMap::new(),
            vec![],
        )
        .expect("valid scores");
        assert_eq!(result.overall_band(), 7.0);
    }

    #[test]
    fn test_from_essay_rejects_empty_scores() {
        let err = EvaluationResult::from_essay(
            "essay",
            "topic",
            SubScores::new(),
            FeedbackMap::new(),
            vec![],
        )
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_failed_result_has_safe_defaults() {
        let result = EvaluationResult::failed("Failed to parse JSON response");
        assert!(result.is_error());
        assert!(result.scores.sub_scores.is_empty());
        assert!(result.feedback.is_empty());
        assert!(result.suggestions.is_empty());
        assert_eq!(result.topic, "");
        assert_eq!(result.word_count, 0);
    }

    #[test]
    fn test_result_serializes_flat_scores() {
        let result = EvaluationResult::from_essay(
            "a b",
            "Technology",
            sample_scores(),
            FeedbackMap::from([("task_response".to_string(), "Clear.".to_string())]),
            vec!["Use more examples.".to_string()],
        )
        .expect("valid scores");

        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["scores"]["task_response"], 7.0);
        assert_eq!(value["scores"]["overall_band"], 7.0);
        assert_eq!(value["word_count"], 2);
        assert!(value.get("error").is_none());

        let back: EvaluationResult = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, result);
    }

    #[test]
    fn test_score_summary_includes_overall_band() {
        let result = EvaluationResult::from_essay(
            "a b",
            "t",
            sample_scores(),
            FeedbackMap::new(),
            vec![],
        )
        .expect("valid scores");
        let summary = ScoreSummary::from(&result);
        assert_eq!(summary.scores.len(), 5);
        assert_eq!(summary.scores["overall_band"], 7.0);
        assert!(summary.error.is_none());
    }

    #[test]
    fn test_score_summary_of_failed_result_keeps_error() {
        let summary = ScoreSummary::from(&EvaluationResult::failed("model call failed"));
        assert!(summary.scores.is_empty());
        assert_eq!(summary.error.as_deref(), Some("model call failed"));
    }

    #[test]
    fn test_model_assessment_accepts_missing_overall_band() {
        let json = r#"{
            "topic": "Cities",
            "scores": {"task_response": 6.0, "lexical_resource": 6.5},
            "feedback": {"task_response": "ok"}
        }"#;
        let parsed: ModelAssessment = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.scores.overall_band, None);
        assert_eq!(parsed.scores.sub_scores.len(), 2);
        assert!(parsed.suggestions.is_empty());
    }

    #[test]
    fn test_model_assessment_accepts_score_alias() {
        let json = r#"{"score": {"overall_band": 6.5, "task_response": 6.5}}"#;
        let parsed: ModelAssessment = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.scores.overall_band, Some(6.5));
        assert_eq!(parsed.scores.sub_scores["task_response"], 6.5);
    }
}
