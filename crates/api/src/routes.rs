use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use scanner_core::{MatchDetails, MatchResult};
use serde::Serialize;
use std::sync::Arc;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/signal", get(signal))
        .route("/analyze/{symbol}", get(analyze))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "predicate": state.scanner.predicate_name(),
    }))
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SignalResponse {
    matches: Vec<MatchResult>,
    count: usize,
}

async fn signal(State(state): State<Arc<AppState>>) -> Result<Json<SignalResponse>, ApiError> {
    let result = state.scanner.scan().await?;
    Ok(Json(SignalResponse {
        count: result.count,
        matches: result.matches,
    }))
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AnalyzeResponse {
    symbol: String,
    signal: bool,
    details: MatchDetails,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let analysis = state.scanner.analyze(&symbol).await?;
    Ok(Json(AnalyzeResponse {
        symbol: analysis.symbol,
        signal: analysis.signal,
        details: analysis.details,
    }))
}
