use axum::Json;
use serde::Serialize;

pub const HELLO_MESSAGE: &str = "Hello from FastAPI";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
}

/// Liveness probe. The body is fixed; existing clients match on it.
#[tracing::instrument(level = "debug")]
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: HELLO_MESSAGE,
    })
}
