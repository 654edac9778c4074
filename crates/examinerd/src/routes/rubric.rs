use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Json};
use examiner_core::{Criterion, PROMPT_VERSION};
use serde::Serialize;

use crate::server::AppState;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new().route("/rubric", get(get_rubric))
}

/// The rubric in force plus the fingerprint of the prompt compiled from it,
/// so clients can pin the contract they were tested against.
#[derive(Debug, Serialize)]
pub struct RubricResponse {
    pub prompt_version: &'static str,
    pub prompt_digest: String,
    pub criteria: Vec<Criterion>,
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_rubric(Extension(state): Extension<Arc<AppState>>) -> Json<RubricResponse> {
    Json(RubricResponse {
        prompt_version: PROMPT_VERSION,
        prompt_digest: state.evaluator.prompt().digest().to_string(),
        criteria: state.evaluator.catalog().criteria.clone(),
    })
}
