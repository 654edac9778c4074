//! The external model seam.
//!
//! The evaluator talks to the language model only through [`ModelClient`].
//! `openai` provides the HTTP implementation; `fakes` provides a scripted
//! in-memory client for tests.

pub mod fakes;
pub mod openai;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::Result;
use crate::domain::input::ImageUpload;

pub use fakes::FakeModelClient;
pub use openai::{OpenAiClient, OpenAiConfig};

/// How the model is asked to shape its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Provider enforces the response schema.
    #[default]
    Structured,
    /// Free-form text expected to contain JSON, possibly fenced.
    Text,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Structured => f.write_str("structured"),
            OutputMode::Text => f.write_str("text"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(OutputMode::Structured),
            "text" => Ok(OutputMode::Text),
            other => Err(format!(
                "unknown output mode '{other}' (expected 'structured' or 'text')"
            )),
        }
    }
}

/// Essay content handed to the model alongside the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelContent {
    Text(String),
    Images {
        instruction: String,
        images: Vec<ImageUpload>,
    },
}

/// One evaluation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub content: ModelContent,
    pub output: OutputMode,
    /// JSON Schema sent when `output` is [`OutputMode::Structured`].
    pub response_schema: Option<Value>,
}

/// What came back from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Already-decoded JSON (structured-output mode).
    Structured(Value),
    /// Raw text that still needs to be parsed.
    Text(String),
}

/// Black-box evaluation capability: `evaluate(prompt, content)`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one request. Transport and provider failures surface as
    /// [`ExaminerError::ModelCallFailed`](crate::ExaminerError::ModelCallFailed).
    async fn evaluate(&self, request: &ModelRequest) -> Result<ModelReply>;

    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("structured".parse::<OutputMode>().unwrap(), OutputMode::Structured);
        assert_eq!(" TEXT ".parse::<OutputMode>().unwrap(), OutputMode::Text);
        assert!("xml".parse::<OutputMode>().is_err());
    }

    #[test]
    fn test_output_mode_display_roundtrip() {
        for mode in [OutputMode::Structured, OutputMode::Text] {
            assert_eq!(mode.to_string().parse::<OutputMode>().unwrap(), mode);
        }
    }
}
