//! Analysis endpoints
//!
//! Each request gets its own `Reconciler` built from the service's evaluation
//! policy. The run itself is CPU-bound, so it executes on the blocking pool.
//!
//! Bodies are read as bytes and parsed here rather than by the `Json`
//! extractor, so a malformed body still gets the JSON error envelope.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::reconcile::views::{build_views, DisplayViews};
use crate::reconcile::{AnalysisRequest, ReconcileConfig, Reconciler, ResultDocument};
use crate::AppState;

/// Result document plus presentation views
#[derive(Debug, Serialize)]
pub struct AnalysisWithViews {
    pub result: ResultDocument,
    pub views: DisplayViews,
}

fn parse_request(body: Result<Bytes, BytesRejection>) -> ApiResult<AnalysisRequest> {
    let body = body?;
    Ok(AnalysisRequest::from_slice(&body)?)
}

async fn run_analysis(state: &AppState, request: AnalysisRequest) -> ApiResult<ResultDocument> {
    info!(claims = request.claims.len(), "Analysis requested");

    let reconciler = Reconciler::new(ReconcileConfig::with_policy(state.config.policy));
    let document = tokio::task::spawn_blocking(move || reconciler.analyze(request))
        .await
        .map_err(|e| ApiError::Internal(format!("Analysis task failed: {}", e)))??;

    Ok(document)
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ResultDocument>> {
    let request = parse_request(body)?;
    run_analysis(&state, request).await.map(Json)
}

/// POST /api/views
pub async fn analyze_with_views(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<AnalysisWithViews>> {
    let request = parse_request(body)?;
    let result = run_analysis(&state, request).await?;
    let views = build_views(&result);
    Ok(Json(AnalysisWithViews { result, views }))
}
