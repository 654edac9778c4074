//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ModelClient, ModelContent, ModelReply, ModelRequest, OutputMode};
use crate::domain::error::{ExaminerError, Result};
use crate::prompt::TEXT_INSTRUCTION;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection and sampling settings for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create a config with defaults; an empty key is a configuration error.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ExaminerError::Config(
                "OPENAI_API_KEY is not set or empty".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.2,
            max_tokens: 2048,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExaminerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn user_message(content: &ModelContent) -> Value {
        match content {
            ModelContent::Text(essay) => json!({
                "role": "user",
                "content": format!("{TEXT_INSTRUCTION}\n{essay}"),
            }),
            ModelContent::Images {
                instruction,
                images,
            } => {
                let mut parts = vec![json!({ "type": "text", "text": instruction })];
                parts.extend(images.iter().map(|image| {
                    json!({
                        "type": "image_url",
                        "image_url": { "url": image.to_data_url() },
                    })
                }));
                json!({ "role": "user", "content": parts })
            }
        }
    }

    fn request_body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                Self::user_message(&request.content),
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let format = match (&request.output, &request.response_schema) {
            (OutputMode::Structured, Some(schema)) => json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "essay_evaluation",
                    "strict": true,
                    "schema": schema,
                },
            }),
            (OutputMode::Structured, None) => json!({ "type": "json_object" }),
            (OutputMode::Text, _) => Value::Null,
        };
        if !format.is_null() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("response_format".to_string(), format);
            }
        }
        body
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn evaluate(&self, request: &ModelRequest) -> Result<ModelReply> {
        let url = self.config.completions_url();
        let body = self.request_body(request);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExaminerError::ModelCallFailed(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(ExaminerError::ModelCallFailed(format!(
                "OpenAI chat API error (status {status}): {error_text}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ExaminerError::ModelCallFailed(format!("invalid response body: {e}")))?;

        if let Some(refusal) = json
            .pointer("/choices/0/message/refusal")
            .and_then(|v| v.as_str())
        {
            return Err(ExaminerError::ModelCallFailed(format!(
                "model refused: {refusal}"
            )));
        }

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ExaminerError::ModelCallFailed("OpenAI API response missing content".to_string())
            })?
            .to_string();

        match request.output {
            OutputMode::Structured => {
                let value = serde_json::from_str(&text).map_err(|e| {
                    ExaminerError::ModelOutputMalformed(format!(
                        "structured output is not valid JSON: {e}"
                    ))
                })?;
                Ok(ModelReply::Structured(value))
            }
            OutputMode::Text => Ok(ModelReply::Text(text)),
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
