//! In-memory model client (testing only)
//!
//! `FakeModelClient` replays scripted replies in order and records every
//! request it receives, so tests can assert whether (and with what) the
//! model was called.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ModelClient, ModelReply, ModelRequest};
use crate::domain::error::{ExaminerError, Result};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(ModelReply),
    Fail(String),
}

/// Scripted model client.
///
/// Replies are consumed front to back; once the script is exhausted the
/// last scripted entry is repeated. With an empty script every call fails.
#[derive(Debug, Default)]
pub struct FakeModelClient {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl FakeModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always reply with this structured JSON value.
    pub fn structured(value: Value) -> Self {
        Self::new().then_reply(ModelReply::Structured(value))
    }

    /// Always reply with this raw text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().then_reply(ModelReply::Text(text.into()))
    }

    /// Always fail with `ModelCallFailed(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new().then_fail(message)
    }

    /// Append a reply to the script.
    pub fn then_reply(self, reply: ModelReply) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Reply(reply));
        self
    }

    /// Append a failure to the script.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Number of `evaluate` calls received.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Copies of all received requests, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ModelClient for FakeModelClient {
    async fn evaluate(&self, request: &ModelRequest) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(request.clone());

        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(entry) = script.pop_front() {
                *last = Some(entry.clone());
                Some(entry)
            } else {
                last.clone()
            }
        };

        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(ExaminerError::ModelCallFailed(message)),
            None => Err(ExaminerError::ModelCallFailed(
                "fake model client has no scripted reply".to_string(),
            )),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelContent, OutputMode};

    fn request() -> ModelRequest {
        ModelRequest {
            system_prompt: "p".to_string(),
            content: ModelContent::Text("e".to_string()),
            output: OutputMode::Text,
            response_schema: None,
        }
    }

    #[tokio::test]
    async fn test_script_is_consumed_then_last_entry_repeats() {
        let fake = FakeModelClient::text("first").then_reply(ModelReply::Text("second".into()));

        assert_eq!(fake.evaluate(&request()).await.unwrap(), ModelReply::Text("first".into()));
        assert_eq!(fake.evaluate(&request()).await.unwrap(), ModelReply::Text("second".into()));
        assert_eq!(fake.evaluate(&request()).await.unwrap(), ModelReply::Text("second".into()));
        assert_eq!(fake.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let fake = FakeModelClient::new();
        let err = fake.evaluate(&request()).await.unwrap_err();
        assert!(matches!(err, ExaminerError::ModelCallFailed(_)));
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_client_records_request() {
        let fake = FakeModelClient::failing("provider down");
        let err = fake.evaluate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("provider down"));
        assert_eq!(fake.last_request(), Some(request()));
    }
}
