// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Caller-facing error taxonomy.

use crate::types::{AcquisitionResult, ExchangeCode, FailureReason, Symbol};

/// All errors a quote lookup can surface to its caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Missing or malformed symbol. Never retried.
    #[error("invalid symbol: {0}")]
    Validation(String),

    /// Every exchange answered "no such symbol".
    #[error("{symbol} not found on any searched exchange")]
    NotFound {
        symbol: Symbol,
        searched: Vec<ExchangeCode>,
    },

    /// A page load or the queue wait exceeded its bound.
    #[error("timed out acquiring {symbol}")]
    Timeout {
        symbol: Symbol,
        searched: Vec<ExchangeCode>,
    },

    /// Pages loaded but no figure could be located.
    #[error("no P/E ratio or earnings data found for {symbol}")]
    ExtractionEmpty {
        symbol: Symbol,
        searched: Vec<ExchangeCode>,
    },

    /// Network or browser automation failure.
    #[error("upstream unavailable for {symbol}: {message}")]
    UpstreamBlocked {
        symbol: Symbol,
        searched: Vec<ExchangeCode>,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),

    /// The drain loop went away before settling the job.
    #[error("request queue closed before the job settled")]
    QueueClosed,
}

impl QuoteError {
    /// Convert a failed acquisition into the matching error variant.
    pub fn from_failure(result: &AcquisitionResult) -> Self {
        let symbol = result.symbol.clone();
        let searched = result.searched_exchanges.clone();
        match result.failure.clone() {
            Some(FailureReason::NotFound) | None => Self::NotFound { symbol, searched },
            Some(FailureReason::Timeout { .. }) => Self::Timeout { symbol, searched },
            Some(FailureReason::ExtractionEmpty) => Self::ExtractionEmpty { symbol, searched },
            Some(FailureReason::UpstreamBlocked(message)) => Self::UpstreamBlocked {
                symbol,
                searched,
                message,
            },
            Some(FailureReason::Internal(message)) => Self::Internal(message),
        }
    }

    /// Exchanges searched before giving up, when known.
    pub fn searched_exchanges(&self) -> Option<&[ExchangeCode]> {
        match self {
            Self::NotFound { searched, .. }
            | Self::Timeout { searched, .. }
            | Self::ExtractionEmpty { searched, .. }
            | Self::UpstreamBlocked { searched, .. } => Some(searched),
            _ => None,
        }
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::ExtractionEmpty { .. } => "extraction_empty",
            Self::UpstreamBlocked { .. } => "upstream_blocked",
            Self::Internal(_) => "internal",
            Self::QueueClosed => "queue_closed",
        }
    }
}

/// Convenience alias used across the crate.
pub type QuoteResult<T> = Result<T, QuoteError>;
