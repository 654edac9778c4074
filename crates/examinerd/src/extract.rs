//! Request extractors for essay submissions.

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use examiner_core::{EssaySubmission, ImageUpload};
use serde::Deserialize;

use crate::error::ApiError;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// JSON body of `POST /evaluate`.
#[derive(Debug, Default, Deserialize)]
pub struct EssayRequest {
    /// Score-only variant: answered with scores and feedback.
    #[serde(default)]
    pub essay: Option<String>,
    /// Full variant: answered with the complete evaluation record.
    #[serde(default)]
    pub essay_text: Option<String>,
}

/// Payload accepted by `POST /evaluate`, dispatched on `Content-Type`.
#[derive(Debug)]
pub enum EvaluatePayload {
    Essay(String),
    EssayText(String),
    Form(EssaySubmission),
}

impl<S> FromRequest<S> for EvaluatePayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    #[tracing::instrument(level = "debug", name = "extract.evaluate_payload", skip_all)]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<EssayRequest>::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            return match (body.essay, body.essay_text) {
                (Some(essay), _) => Ok(EvaluatePayload::Essay(essay)),
                (None, Some(text)) => Ok(EvaluatePayload::EssayText(text)),
                (None, None) => Err(ApiError::InvalidInput(
                    "request body must contain 'essay' or 'essay_text'".to_string(),
                )),
            };
        }

        if content_type.starts_with("multipart/form-data") {
            let MultipartSubmission(submission) =
                MultipartSubmission::from_request(req, state).await?;
            return Ok(EvaluatePayload::Form(submission));
        }

        Err(ApiError::UnsupportedMediaType(content_type))
    }
}

/// A multipart form read into an [`EssaySubmission`].
///
/// Recognised fields: `essay_text`, and `file` / `files` for images (both
/// names are accepted on every route). Other fields are ignored.
#[derive(Debug)]
pub struct MultipartSubmission(pub EssaySubmission);

impl<S> FromRequest<S> for MultipartSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    #[tracing::instrument(level = "debug", name = "extract.multipart", skip_all)]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| body_error(e.status(), e.body_text()))?;
        read_submission(multipart).await.map(Self)
    }
}

async fn read_submission(mut multipart: Multipart) -> Result<EssaySubmission, ApiError> {
    let mut submission = EssaySubmission::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "essay_text" => {
                submission.essay_text = Some(field.text().await.map_err(multipart_error)?);
            }
            "file" | "files" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty, unnamed part for an untouched file input.
                if bytes.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                submission
                    .files
                    .push(ImageUpload::new(file_name, content_type, bytes.to_vec()));
            }
            other => tracing::debug!(field = %other, "ignoring multipart field"),
        }
    }
    Ok(submission)
}

fn multipart_error(err: MultipartError) -> ApiError {
    body_error(err.status(), err.body_text())
}

/// Map a body rejection to an API error, keeping the length-limit status.
fn body_error(status: StatusCode, detail: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(detail)
    } else {
        ApiError::InvalidInput(detail)
    }
}
