use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json};

use crate::error::ApiError;
use crate::extract::{EvaluatePayload, MultipartSubmission};
use crate::server::AppState;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/evaluate", post(evaluate))
        .route("/evaluate-multi", post(evaluate_multi))
}

/// `{"essay"}` JSON yields scores and feedback only; `{"essay_text"}` JSON and
/// multipart forms yield the full evaluation record.
#[tracing::instrument(level = "info", skip_all)]
pub async fn evaluate(
    Extension(state): Extension<Arc<AppState>>,
    payload: EvaluatePayload,
) -> Result<Response, ApiError> {
    let response = match payload {
        EvaluatePayload::Essay(essay) => {
            Json(state.evaluator.evaluate_scores(&essay).await?).into_response()
        }
        EvaluatePayload::EssayText(text) => {
            Json(state.evaluator.evaluate_text(&text).await?).into_response()
        }
        EvaluatePayload::Form(submission) => {
            Json(state.evaluator.evaluate_submission(submission, false).await?).into_response()
        }
    };
    Ok(response)
}

/// Several page images of one essay; the model picks the most complete one.
#[tracing::instrument(level = "info", skip_all)]
pub async fn evaluate_multi(
    Extension(state): Extension<Arc<AppState>>,
    MultipartSubmission(submission): MultipartSubmission,
) -> Result<Response, ApiError> {
    let result = state.evaluator.evaluate_submission(submission, true).await?;
    Ok(Json(result).into_response())
}
