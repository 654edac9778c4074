use axum::routing::get;
use axum::Router;

pub mod evaluate;
pub mod health;
pub mod rubric;

/// Routes are served under `/api` and, for the original web client, `/api/py`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new()
        .nest("/api", api_router())
        .nest("/api/py", api_router())
}

#[tracing::instrument(level = "debug", skip_all)]
fn api_router() -> Router {
    Router::new()
        .route("/hello", get(health::get_health))
        .route("/helloFastApi", get(health::get_health))
        .merge(evaluate::router())
        .merge(rubric::router())
}
