//! System prompt compilation.
//!
//! The compiled prompt is the contract with the external model: it lists the
//! criteria, the band descriptors, the task, and the exact JSON shape the
//! model must return. Any wording change can alter the model's output, so the
//! text is versioned ([`PROMPT_VERSION`]) and fingerprinted (SHA-256).
//!
//! Compilation is a pure function of the catalog; the result is computed once
//! at startup and shared read-only.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::domain::error::{ExaminerError, Result};
use crate::domain::rubric::{Band, RubricCatalog};

/// Wording revision of the compiled prompt.
pub const PROMPT_VERSION: &str = "ielts-writing-v1";

/// Returned by [`compile_system_prompt`] when the catalog cannot be rendered.
/// Callers must check for it before handing the text to a model.
pub const RUBRIC_UNAVAILABLE: &str = "Error: Rubric not found.";

/// Criterion keys named by [`RESPONSE_SCHEMA_TEMPLATE`].
pub const SCHEMA_CRITERION_KEYS: [&str; 4] = [
    "task_response",
    "coherence_and_cohesion",
    "lexical_resource",
    "grammatical_range_and_accuracy",
];

const PREAMBLE: &str =
    "You are an expert examiner evaluating writing responses based on the following rubric:";

const TASK_STATEMENT: &str = "Your task:
- Identify the topic/question in the response.
- Score the essay based on the rubric.
- Provide structured feedback for each criterion.
- Give actionable improvement suggestions.";

/// JSON shape the model is asked to return.
pub const RESPONSE_SCHEMA_TEMPLATE: &str = r#"{
  "topic": "Extracted or generated topic",
  "word_count": 250,
  "scores": {
    "task_response": 7.0,
    "coherence_and_cohesion": 6.5,
    "lexical_resource": 7.5,
    "grammatical_range_and_accuracy": 6.0,
    "overall_band": 7.0
  },
  "feedback": {
    "task_response": "Your response is strong but could benefit from more specific examples.",
    "coherence_and_cohesion": "Logical flow is clear, but transitions could be smoother.",
    "lexical_resource": "Good vocabulary variety, though some word choices feel repetitive.",
    "grammatical_range_and_accuracy": "Grammar is mostly accurate, but complex sentence structures need refining."
  },
  "suggestions": [
    "Use more varied linking words to improve cohesion.",
    "Provide deeper analysis to support key arguments.",
    "Work on sentence variety to enhance fluency."
  ],
  "original_essay": "The full essay text"
}"#;

/// User-message lead-in for typed essays.
pub const TEXT_INSTRUCTION: &str = "Evaluate the following IELTS essay:";

/// User-message instruction for a single uploaded image.
pub const IMAGE_INSTRUCTION: &str = "The essay is provided as an image. \
Transcribe the handwritten or typed text exactly into \"original_essay\", \
then evaluate it.";

/// User-message instruction for several uploaded images.
pub const MULTI_IMAGE_INSTRUCTION: &str = "The essay is provided as several images. \
If more than one essay is visible, select the single most complete essay, \
transcribe it exactly into \"original_essay\", and evaluate only that essay. \
Return one consolidated JSON result.";

fn check_catalog(catalog: &RubricCatalog) -> std::result::Result<(), String> {
    catalog.validate()?;
    for key in SCHEMA_CRITERION_KEYS {
        if catalog.get(key).is_none() {
            return Err(format!("rubric is missing criterion '{key}'"));
        }
    }
    Ok(())
}

/// Render the system prompt for `catalog`.
///
/// Returns [`RUBRIC_UNAVAILABLE`] when the catalog is empty or malformed.
pub fn compile_system_prompt(catalog: &RubricCatalog) -> String {
    if let Err(reason) = check_catalog(catalog) {
        tracing::warn!(event = "prompt.rubric_invalid", reason = %reason);
        return RUBRIC_UNAVAILABLE.to_string();
    }

    let criteria_text = catalog
        .criteria
        .iter()
        .map(|c| format!("- **{}**: {}", c.name, c.description))
        .collect::<Vec<_>>()
        .join("\n");

    let band_text = Band::ALL
        .iter()
        .map(|band| {
            let exemplars = catalog
                .criteria
                .iter()
                .map(|c| format!("{}: {}", c.name, c.exemplar(*band).unwrap_or_default()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("**{}**: {}", band.label(), exemplars)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::new();
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n### **Evaluation Criteria**\n");
    prompt.push_str(&criteria_text);
    prompt.push_str("\n\n### **Band Descriptors**\n");
    prompt.push_str(&band_text);
    prompt.push_str("\n\n");
    prompt.push_str(TASK_STATEMENT);
    prompt.push_str("\n\nReturn your response in the following structured JSON format:\n```json\n");
    prompt.push_str(RESPONSE_SCHEMA_TEMPLATE);
    prompt.push_str("\n```\n");
    prompt
}

/// JSON Schema for provider-enforced structured output, derived from the
/// catalog's criterion keys.
pub fn response_json_schema(catalog: &RubricCatalog) -> Value {
    let mut score_props = serde_json::Map::new();
    let mut feedback_props = serde_json::Map::new();
    let mut score_required = Vec::new();
    let mut feedback_required = Vec::new();

    for key in catalog.keys() {
        score_props.insert(key.to_string(), json!({ "type": "number" }));
        feedback_props.insert(key.to_string(), json!({ "type": "string" }));
        score_required.push(Value::from(key));
        feedback_required.push(Value::from(key));
    }
    score_props.insert("overall_band".to_string(), json!({ "type": "number" }));
    score_required.push(Value::from("overall_band"));

    json!({
        "type": "object",
        "properties": {
            "topic": { "type": "string" },
            "word_count": { "type": "integer" },
            "scores": {
                "type": "object",
                "properties": score_props,
                "required": score_required,
                "additionalProperties": false
            },
            "feedback": {
                "type": "object",
                "properties": feedback_props,
                "required": feedback_required,
                "additionalProperties": false
            },
            "suggestions": { "type": "array", "items": { "type": "string" } },
            "original_essay": { "type": "string" }
        },
        "required": ["topic", "word_count", "scores", "feedback", "suggestions", "original_essay"],
        "additionalProperties": false
    })
}

/// Lowercase SHA-256 hex digest of `text`.
pub fn prompt_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// A successfully compiled system prompt with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    text: String,
    digest: String,
}

impl SystemPrompt {
    /// Compile `catalog`, turning the sentinel into [`ExaminerError::RubricUnavailable`].
    pub fn compile(catalog: &RubricCatalog) -> Result<Self> {
        let text = compile_system_prompt(catalog);
        if text == RUBRIC_UNAVAILABLE {
            return Err(ExaminerError::RubricUnavailable(
                "rubric catalog is empty or malformed".to_string(),
            ));
        }
        let digest = prompt_digest(&text);
        let short = &digest[..12];
        tracing::info!(
            event = "prompt.compiled",
            version = PROMPT_VERSION,
            digest = %short,
            len = text.len(),
        );
        Ok(Self { text, digest })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Full SHA-256 hex digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Short form (first 12 hex chars).
    pub fn short_digest(&self) -> &str {
        &self.digest[..12.min(self.digest.len())]
    }
}
