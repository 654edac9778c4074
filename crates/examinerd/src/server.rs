use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Extension, Router};
use examiner_core::{EvaluationRequestHandler, ModelClient, OpenAiClient, RubricCatalog, METRICS};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::cli::ServeArgs;
use crate::routes;

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<EvaluationRequestHandler>,
    pub max_upload_bytes: usize,
    pub started_at: Instant,
}

impl AppState {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(evaluator: EvaluationRequestHandler) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            started_at: Instant::now(),
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Build the production state: OpenAI client plus the IELTS rubric.
    ///
    /// Fails when the api key is missing or the rubric does not compile.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn from_args(args: &ServeArgs) -> anyhow::Result<Self> {
        let client: Arc<dyn ModelClient> = Arc::new(
            OpenAiClient::new(args.openai_config()?).context("failed to build model client")?,
        );
        let evaluator = EvaluationRequestHandler::new(
            client,
            RubricCatalog::ielts_writing(),
            args.evaluator_options(),
        )
        .context("failed to compile system prompt")?;
        Ok(Self::new(evaluator).with_max_upload_bytes(args.max_upload_bytes))
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    let state = Arc::new(state);

    Router::new()
        .merge(routes::router())
        .route("/health", get(routes::health::get_health))
        .layer(Extension(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let evaluator = state.evaluator.clone();
    tracing::info!(
        %addr,
        output_mode = %evaluator.options().output_mode,
        error_policy = %evaluator.options().error_policy,
        prompt_digest = %evaluator.prompt().short_digest(),
        "examinerd listening"
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    METRICS.flush();
    tracing::info!("examinerd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
