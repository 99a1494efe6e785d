//! HTTP boundary: `POST /api/analyze`, `GET /signals/{symbol}/{timeframe}`
//! and `GET /health`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::AppError;
use crate::model::{AnalysisResult, Timeframe};
use crate::service::{AnalysisService, AnalyzeRequest};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
}

/// Body of a successful `POST /api/analyze`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub cached: bool,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles_count: Option<usize>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation { field, .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string(), "field": field }),
            ),
            AppError::Engine(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": e.to_string() }),
            ),
            AppError::Upstream(detail) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "upstream candle data unavailable", "detail": detail }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/signals/{symbol}/{timeframe}", get(signals))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(bind_addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!(addr = %bind_addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")
}

// Body is taken as raw bytes so every rejection is a JSON error naming the field.
async fn analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let req = AnalyzeRequest::from_json(&body).inspect_err(|e| {
        tracing::debug!(error = %e, "Rejected analyze request");
    })?;
    let outcome = state.service.analyze(&req).await?;
    Ok(Json(AnalyzeResponse {
        result: outcome.result,
        cached: outcome.cached,
        symbol: req.symbol,
        timeframe: req.timeframe,
        candles_count: outcome.candles_count,
    }))
}

async fn signals(
    State(state): State<AppState>,
    Path((symbol, timeframe)): Path<(String, String)>,
) -> Result<Json<AnalysisResult>, AppError> {
    let req = AnalyzeRequest::new(&symbol, &timeframe)?;
    let outcome = state.service.analyze(&req).await?;
    Ok(Json(outcome.result))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
