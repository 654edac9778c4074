//! Evaluation request orchestration.
//!
//! One request runs one sequential pipeline:
//!
//! ```text
//! Received -> Validating -> AwaitingModel -> ParsingModel -> Done
//!                 |               |                |
//!                 +---------------+----------------+----> Failed
//! ```
//!
//! Validation failures are returned immediately and never reach the model.
//! Model and parsing failures are handled according to [`ErrorPolicy`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::band::{overall_band, MAX_BAND, MIN_BAND};
use crate::domain::error::{ExaminerError, Result};
use crate::domain::evaluation::{
    word_count, BandScores, EvaluationResult, ModelAssessment, ScoreSummary, SubScores,
};
use crate::domain::input::{EssayInput, EssaySubmission};
use crate::domain::rubric::RubricCatalog;
use crate::llm::{ModelClient, ModelContent, ModelRequest, OutputMode};
use crate::metrics::METRICS;
use crate::obs;
use crate::parser::ResponseParser;
use crate::prompt::{response_json_schema, SystemPrompt, IMAGE_INSTRUCTION, MULTI_IMAGE_INSTRUCTION};

/// Pipeline state of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStage {
    Received,
    Validating,
    AwaitingModel,
    ParsingModel,
    Done,
    Failed,
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvaluationStage::Received => "received",
            EvaluationStage::Validating => "validating",
            EvaluationStage::AwaitingModel => "awaiting_model",
            EvaluationStage::ParsingModel => "parsing_model",
            EvaluationStage::Done => "done",
            EvaluationStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What to do when the model call or its output fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Return the error; the HTTP layer turns it into a 5xx status.
    #[default]
    Status,
    /// Return an error-shaped [`EvaluationResult`] with `error` populated.
    Embedded,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Status => f.write_str("status"),
            ErrorPolicy::Embedded => f.write_str("embedded"),
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(ErrorPolicy::Status),
            "embedded" => Ok(ErrorPolicy::Embedded),
            other => Err(format!(
                "unknown error policy '{other}' (expected 'status' or 'embedded')"
            )),
        }
    }
}

/// Behavioural switches for [`EvaluationRequestHandler`].
#[derive(Debug, Clone, Default)]
pub struct EvaluatorOptions {
    pub output_mode: OutputMode,
    pub error_policy: ErrorPolicy,
    /// Keep the model's own `overall_band` when it supplies one.
    pub trust_model_band: bool,
    /// Upper bound on the model call, independent of the client's own timeout.
    pub model_timeout: Option<Duration>,
}

/// Orchestrates validation, the model call and post-processing.
///
/// The model client is injected, so tests can substitute
/// [`FakeModelClient`](crate::llm::FakeModelClient).
pub struct EvaluationRequestHandler {
    client: Arc<dyn ModelClient>,
    catalog: Arc<RubricCatalog>,
    prompt: Arc<SystemPrompt>,
    response_schema: Value,
    parser: ResponseParser,
    options: EvaluatorOptions,
}

impl EvaluationRequestHandler {
    /// Build a handler, compiling the system prompt once.
    pub fn new(
        client: Arc<dyn ModelClient>,
        catalog: RubricCatalog,
        options: EvaluatorOptions,
    ) -> Result<Self> {
        let prompt = SystemPrompt::compile(&catalog)?;
        let response_schema = response_json_schema(&catalog);
        Ok(Self {
            client,
            catalog: Arc::new(catalog),
            prompt: Arc::new(prompt),
            response_schema,
            parser: ResponseParser::for_mode(options.output_mode),
            options,
        })
    }

    pub fn catalog(&self) -> &RubricCatalog {
        &self.catalog
    }

    pub fn prompt(&self) -> &SystemPrompt {
        &self.prompt
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    /// Validate a raw submission and evaluate it.
    pub async fn evaluate_submission(
        &self,
        submission: EssaySubmission,
        multi: bool,
    ) -> Result<EvaluationResult> {
        let input = submission.into_input(multi);
        let kind = input.as_ref().map_or("submission", EssayInput::kind);
        self.track(kind, input).await
    }

    /// Evaluate a single typed essay.
    pub async fn evaluate_text(&self, essay: &str) -> Result<EvaluationResult> {
        self.evaluate(EssayInput::Text(essay.to_string())).await
    }

    /// Evaluate a typed essay and return only scores and feedback.
    pub async fn evaluate_scores(&self, essay: &str) -> Result<ScoreSummary> {
        let result = self.evaluate_text(essay).await?;
        Ok(ScoreSummary::from(&result))
    }

    /// Evaluate an already-constructed input.
    pub async fn evaluate(&self, input: EssayInput) -> Result<EvaluationResult> {
        self.track(input.kind(), Ok(input)).await
    }

    /// Run one request inside its span, with counters and lifecycle events.
    ///
    /// `input` is the outcome of assembling the request; an `Err` there is
    /// recorded as a validation failure.
    async fn track(&self, kind: &str, input: Result<EssayInput>) -> Result<EvaluationResult> {
        let request_id = Uuid::new_v4().to_string();
        let span = obs::evaluation_span(&request_id);
        async move {
            let started = Instant::now();
            METRICS.inc_evaluations_requested();
            obs::emit_evaluation_started(&request_id, kind);
            obs::emit_stage(&request_id, EvaluationStage::Received);

            match self.run(&request_id, input).await {
                Ok(result) => {
                    obs::emit_stage(&request_id, EvaluationStage::Done);
                    obs::emit_evaluation_finished(
                        &request_id,
                        started.elapsed().as_millis() as u64,
                        result.overall_band(),
                        result.word_count,
                    );
                    Ok(result)
                }
                Err(err) => {
                    obs::emit_stage(&request_id, EvaluationStage::Failed);
                    obs::emit_evaluation_failed(&request_id, err.kind(), &err);
                    METRICS.inc_evaluations_failed();
                    if matches!(err, ExaminerError::ModelOutputMalformed(_)) {
                        METRICS.inc_malformed_outputs();
                    }
                    match self.options.error_policy {
                        ErrorPolicy::Embedded if !err.is_client_error() => {
                            Ok(EvaluationResult::failed(err.to_string()))
                        }
                        _ => Err(err),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request_id: &str, input: Result<EssayInput>) -> Result<EvaluationResult> {
        obs::emit_stage(request_id, EvaluationStage::Validating);
        let input = input?;
        validate_input(&input)?;

        obs::emit_stage(request_id, EvaluationStage::AwaitingModel);
        let request = self.build_request(&input);
        METRICS.inc_model_calls();
        let call = self.client.evaluate(&request);
        let reply = match self.options.model_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                ExaminerError::ModelCallFailed(format!(
                    "{} call timed out after {}s",
                    self.client.provider_name(),
                    limit.as_secs()
                ))
            })??,
            None => call.await?,
        };

        obs::emit_stage(request_id, EvaluationStage::ParsingModel);
        let assessment = self.parser.parse(reply)?;
        self.finish(&input, assessment)
    }

    fn build_request(&self, input: &EssayInput) -> ModelRequest {
        let content = match input {
            EssayInput::Text(text) => ModelContent::Text(text.clone()),
            EssayInput::Image(image) => ModelContent::Images {
                instruction: IMAGE_INSTRUCTION.to_string(),
                images: vec![image.clone()],
            },
            EssayInput::Images(images) => ModelContent::Images {
                instruction: MULTI_IMAGE_INSTRUCTION.to_string(),
                images: images.clone(),
            },
        };
        let response_schema = match self.options.output_mode {
            OutputMode::Structured => Some(self.response_schema.clone()),
            OutputMode::Text => None,
        };
        ModelRequest {
            system_prompt: self.prompt.text().to_string(),
            content,
            output: self.options.output_mode,
            response_schema,
        }
    }

    /// Reconcile the model's assessment with the rubric and the input.
    fn finish(&self, input: &EssayInput, assessment: ModelAssessment) -> Result<EvaluationResult> {
        let mut sub_scores = SubScores::new();
        for key in self.catalog.keys() {
            let score = assessment
                .scores
                .sub_scores
                .get(key)
                .copied()
                .ok_or_else(|| {
                    ExaminerError::ModelOutputMalformed(format!("missing score for '{key}'"))
                })?;
            sub_scores.insert(key.to_string(), score);
        }

        let computed = overall_band(&sub_scores)
            .map_err(|e| ExaminerError::ModelOutputMalformed(e.to_string()))?;
        let overall = match assessment.scores.overall_band {
            Some(band)
                if self.options.trust_model_band
                    && band.is_finite()
                    && (MIN_BAND..=MAX_BAND).contains(&band) =>
            {
                band
            }
            _ => computed,
        };

        let (original_essay, words) = match input {
            EssayInput::Text(text) => (text.clone(), word_count(text)),
            EssayInput::Image(_) | EssayInput::Images(_) => {
                let transcribed = assessment.original_essay;
                let words = if transcribed.trim().is_empty() {
                    assessment
                        .word_count
                        .filter(|w| w.is_finite() && *w > 0.0)
                        .map(|w| w.round() as u64)
                        .unwrap_or(0)
                } else {
                    word_count(&transcribed)
                };
                (transcribed, words)
            }
        };

        Ok(EvaluationResult {
            topic: assessment.topic,
            word_count: words,
            scores: BandScores {
                sub_scores,
                overall_band: overall,
            },
            feedback: assessment.feedback,
            suggestions: assessment.suggestions,
            original_essay,
            error: None,
        })
    }
}

fn validate_input(input: &EssayInput) -> Result<()> {
    match input {
        EssayInput::Text(text) if text.trim().is_empty() => Err(ExaminerError::InvalidInput(
            "Essay text cannot be empty.".to_string(),
        )),
        EssayInput::Text(_) => Ok(()),
        EssayInput::Image(image) => image.validate(),
        EssayInput::Images(images) if images.is_empty() => Err(ExaminerError::InvalidInput(
            "at least one image file is required".to_string(),
        )),
        EssayInput::Images(images) => images.iter().try_for_each(|image| image.validate()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_policy_parse() {
        assert_eq!("status".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Status);
        assert_eq!("Embedded".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Embedded);
        assert!("silent".parse::<ErrorPolicy>().is_err());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(EvaluationStage::AwaitingModel.to_string(), "awaiting_model");
        assert_eq!(EvaluationStage::Failed.to_string(), "failed");
    }

    #[test]
    fn test_validate_input_rejects_blank_text_and_empty_images() {
        assert!(validate_input(&EssayInput::Text(" \n".into())).is_err());
        assert!(validate_input(&EssayInput::Images(vec![])).is_err());
        assert!(validate_input(&EssayInput::Text("ok".into())).is_ok());
    }
}
