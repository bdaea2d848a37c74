// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! REST endpoints consumed by the portfolio dashboard.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use pe_scout::{Quote, QuoteService};

use crate::error::ApiError;

/// Build the axum Router with all REST endpoints.
pub fn router(service: Arc<QuoteService>) -> Router {
    // The dashboard is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/quote", get(handle_quote))
        .layer(cors)
        .with_state(service)
}

/// Serve the REST API until the listener fails.
pub async fn start(addr: SocketAddr, service: Arc<QuoteService>) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(service): State<Arc<QuoteService>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "chromium": service.is_live(),
        "cacheEntries": service.cache_len(),
        "pendingJobs": service.pending_jobs(),
    }))
}

#[derive(Debug, Deserialize, Default)]
struct QuoteParams {
    symbol: Option<String>,
}

async fn handle_quote(
    State(service): State<Arc<QuoteService>>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<Quote>, ApiError> {
    let raw = params
        .symbol
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(ApiError::missing_symbol)?;

    let quote = service
        .quote(&raw)
        .await
        .map_err(|err| ApiError::new(err, raw.trim()))?;
    Ok(Json(quote))
}
