//! Turning model replies into [`ModelAssessment`]s.
//!
//! Two variants, chosen by the configured [`OutputMode`]:
//! - `Structured`: the provider enforced the schema; the JSON value is
//!   decoded as-is.
//! - `TextJson`: best effort. Markdown fence markers are stripped and the
//!   remainder parsed; if that fails, the first JSON object embedded in the
//!   text is tried. Anything else is `ModelOutputMalformed`.

use serde_json::Value;

use crate::domain::error::{ExaminerError, Result};
use crate::domain::evaluation::ModelAssessment;
use crate::llm::{ModelReply, OutputMode};

const FENCE_JSON: &str = "```json";
const FENCE: &str = "```";

/// Remove markdown code-fence markers and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> String {
    text.replace(FENCE_JSON, "")
        .replace(FENCE, "")
        .trim()
        .to_string()
}

/// Decode the first JSON value starting at the first `{` in `text`.
fn first_embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

fn decode(value: Value) -> Result<ModelAssessment> {
    if !value.is_object() {
        return Err(ExaminerError::ModelOutputMalformed(format!(
            "expected a JSON object, got {}",
            json_type(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| {
        ExaminerError::ModelOutputMalformed(format!("response does not match schema: {e}"))
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reply parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseParser {
    Structured,
    TextJson,
}

impl ResponseParser {
    pub fn for_mode(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Structured => ResponseParser::Structured,
            OutputMode::Text => ResponseParser::TextJson,
        }
    }

    pub fn parse(&self, reply: ModelReply) -> Result<ModelAssessment> {
        match (self, reply) {
            (_, ModelReply::Structured(value)) => decode(value),
            (ResponseParser::Structured, ModelReply::Text(text)) => {
                let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
                    ExaminerError::ModelOutputMalformed(format!("Failed to parse JSON response: {e}"))
                })?;
                decode(value)
            }
            (ResponseParser::TextJson, ModelReply::Text(text)) => {
                let cleaned = strip_code_fences(&text);
                match serde_json::from_str::<Value>(&cleaned) {
                    Ok(value) => decode(value),
                    Err(e) => match first_embedded_object(&cleaned) {
                        Some(value) => decode(value),
                        None => Err(ExaminerError::ModelOutputMalformed(format!(
                            "Failed to parse JSON response: {e}"
                        ))),
                    },
                }
            }
        }
    }
}
