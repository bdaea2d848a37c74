// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Mapping of pipeline errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use pe_scout::QuoteError;

/// A failed quote request, with the symbol as the caller sent it.
#[derive(Debug)]
pub struct ApiError {
    pub error: QuoteError,
    pub symbol: Option<String>,
}

impl ApiError {
    pub fn new(error: QuoteError, symbol: impl Into<String>) -> Self {
        Self {
            error,
            symbol: Some(symbol.into()),
        }
    }

    pub fn missing_symbol() -> Self {
        Self {
            error: QuoteError::Validation("symbol query parameter is required".into()),
            symbol: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            QuoteError::Validation(_) => StatusCode::BAD_REQUEST,
            QuoteError::NotFound { .. } | QuoteError::ExtractionEmpty { .. } => {
                StatusCode::NOT_FOUND
            }
            QuoteError::Timeout { .. }
            | QuoteError::UpstreamBlocked { .. }
            | QuoteError::Internal(_)
            | QuoteError::QueueClosed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(symbol = ?self.symbol, "quote request failed: {}", self.error);
        } else {
            tracing::info!(symbol = ?self.symbol, "quote request rejected: {}", self.error);
        }

        let mut body = json!({
            "error": self.error.to_string(),
            "kind": self.error.kind(),
            "symbol": self.symbol,
        });
        if let Some(searched) = self.error.searched_exchanges() {
            body["searchedExchanges"] = json!(searched);
        }

        (status, Json(body)).into_response()
    }
}
