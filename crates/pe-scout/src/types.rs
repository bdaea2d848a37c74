// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Core data types for quote requests and acquisition results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QuoteError;

/// Longest symbol accepted from a caller, suffix excluded.
const MAX_SYMBOL_LEN: usize = 20;

/// Trading venue a quote page is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeCode {
    /// National Stock Exchange (primary listing venue).
    #[serde(rename = "NSE")]
    Nse,
    /// Bombay Stock Exchange (secondary listing venue).
    #[serde(rename = "BOM")]
    Bse,
}

impl ExchangeCode {
    /// Default search order: national exchange first.
    pub const SEARCH_ORDER: [ExchangeCode; 2] = [ExchangeCode::Nse, ExchangeCode::Bse];

    /// Code used by the quote host in `SYMBOL:CODE` paths.
    pub fn host_code(self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BOM",
        }
    }

    /// Parse a bare exchange code or a symbol suffix (`.NS`, `:BOM`, ...).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_ascii_uppercase().as_str() {
            "NS" | "NSE" => Some(Self::Nse),
            "BO" | "BOM" | "BSE" => Some(Self::Bse),
            _ => None,
        }
    }
}

impl fmt::Display for ExchangeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host_code())
    }
}

/// A validated, normalized ticker with no exchange suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Validate an already-stripped ticker.
    pub fn new(raw: &str) -> Result<Self, QuoteError> {
        let ticker = raw.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Err(QuoteError::Validation("symbol parameter is required".into()));
        }
        if ticker.len() > MAX_SYMBOL_LEN {
            return Err(QuoteError::Validation(format!(
                "symbol exceeds {MAX_SYMBOL_LEN} characters"
            )));
        }
        let first_ok = ticker
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        let rest_ok = ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '&' | '-' | '_' | '.'));
        if !first_ok || !rest_ok {
            return Err(QuoteError::Validation(format!(
                "symbol {ticker:?} contains unsupported characters"
            )));
        }
        Ok(Self(ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inbound lookup. Built per call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub symbol: Symbol,
    pub preferred_exchange: Option<ExchangeCode>,
}

impl QuoteRequest {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            preferred_exchange: None,
        }
    }

    /// Parse caller input such as `hdfcbank`, `HDFCBANK.BO` or `TCS:NSE`.
    ///
    /// A recognized exchange suffix is stripped and becomes the preferred
    /// exchange. Unrecognized suffixes after a dot stay part of the ticker
    /// (some tickers contain dots).
    pub fn parse(raw: &str) -> Result<Self, QuoteError> {
        let trimmed = raw.trim();
        let split = trimmed
            .rfind([':', '.'])
            .map(|idx| (&trimmed[..idx], &trimmed[idx + 1..]));

        if let Some((ticker, suffix)) = split {
            if let Some(exchange) = ExchangeCode::from_suffix(suffix) {
                return Ok(Self {
                    symbol: Symbol::new(ticker)?,
                    preferred_exchange: Some(exchange),
                });
            }
            if trimmed[ticker.len()..].starts_with(':') {
                return Err(QuoteError::Validation(format!(
                    "unknown exchange suffix {suffix:?}"
                )));
            }
        }

        Ok(Self::new(Symbol::new(trimmed)?))
    }

    /// Exchanges to try, preferred first, each at most once.
    pub fn search_order(&self) -> Vec<ExchangeCode> {
        let mut order = Vec::with_capacity(ExchangeCode::SEARCH_ORDER.len());
        if let Some(preferred) = self.preferred_exchange {
            order.push(preferred);
        }
        for exchange in ExchangeCode::SEARCH_ORDER {
            if !order.contains(&exchange) {
                order.push(exchange);
            }
        }
        order
    }
}

/// Why an acquisition attempt produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("not found")]
    NotFound,

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no P/E ratio or earnings figure on page")]
    ExtractionEmpty,

    #[error("upstream request failed: {0}")]
    UpstreamBlocked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FailureReason {
    /// Only explicit "not found" answers are worth remembering; everything
    /// else may succeed on the next request.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Rank used to pick the aggregate reason when every exchange fails.
    pub(crate) fn severity(&self) -> u8 {
        match self {
            Self::NotFound => 0,
            Self::ExtractionEmpty => 1,
            Self::Timeout { .. } => 2,
            Self::UpstreamBlocked(_) => 3,
            Self::Internal(_) => 4,
        }
    }
}

/// Outcome of one acquisition, for one exchange or for a whole search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionResult {
    pub symbol: Symbol,
    /// Exchange that produced the data, or the last exchange tried on failure.
    pub exchange: Option<ExchangeCode>,
    pub pe_ratio: Option<String>,
    pub latest_earnings: Option<String>,
    pub success: bool,
    pub failure: Option<FailureReason>,
    pub searched_exchanges: Vec<ExchangeCode>,
    pub fetched_at: DateTime<Utc>,
    /// `Live` when fetched for this request, `Cache` when served from cache.
    pub provenance: Provenance,
}

impl AcquisitionResult {
    pub fn found(
        symbol: Symbol,
        exchange: ExchangeCode,
        pe_ratio: Option<String>,
        latest_earnings: Option<String>,
    ) -> Self {
        Self {
            symbol,
            exchange: Some(exchange),
            pe_ratio,
            latest_earnings,
            success: true,
            failure: None,
            searched_exchanges: vec![exchange],
            fetched_at: Utc::now(),
            provenance: Provenance::Live,
        }
    }

    pub fn failed(symbol: Symbol, exchange: Option<ExchangeCode>, reason: FailureReason) -> Self {
        Self {
            symbol,
            exchange,
            pe_ratio: None,
            latest_earnings: None,
            success: false,
            failure: Some(reason),
            searched_exchanges: exchange.into_iter().collect(),
            fetched_at: Utc::now(),
            provenance: Provenance::Live,
        }
    }

    /// Human-readable failure text, naming every exchange searched.
    pub fn error_reason(&self) -> Option<String> {
        let reason = self.failure.as_ref()?;
        let searched = self
            .searched_exchanges
            .iter()
            .map(ExchangeCode::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("{} {reason} on [{searched}]", self.symbol))
    }
}

/// Where a returned quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Cache,
    Static,
}

/// Figures handed back to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: Symbol,
    pub exchange: Option<ExchangeCode>,
    pub pe_ratio: Option<String>,
    pub latest_earnings: Option<String>,
    #[serde(rename = "source")]
    pub provenance: Provenance,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl From<AcquisitionResult> for Quote {
    fn from(result: AcquisitionResult) -> Self {
        Self {
            symbol: result.symbol,
            exchange: result.exchange,
            pe_ratio: result.pe_ratio,
            latest_earnings: result.latest_earnings,
            provenance: result.provenance,
            fetched_at: Some(result.fetched_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_known_suffixes() {
        let req = QuoteRequest::parse(" hdfcbank.bo ").unwrap();
        assert_eq!(req.symbol.as_str(), "HDFCBANK");
        assert_eq!(req.preferred_exchange, Some(ExchangeCode::Bse));

        let req = QuoteRequest::parse("TCS:NSE").unwrap();
        assert_eq!(req.symbol.as_str(), "TCS");
        assert_eq!(req.preferred_exchange, Some(ExchangeCode::Nse));

        let req = QuoteRequest::parse("INFY.BSE").unwrap();
        assert_eq!(req.preferred_exchange, Some(ExchangeCode::Bse));
    }

    #[test]
    fn test_parse_keeps_unknown_dot_suffix() {
        let req = QuoteRequest::parse("BRK.B").unwrap();
        assert_eq!(req.symbol.as_str(), "BRK.B");
        assert_eq!(req.preferred_exchange, None);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(QuoteRequest::parse(""), Err(QuoteError::Validation(_))));
        assert!(matches!(QuoteRequest::parse("   "), Err(QuoteError::Validation(_))));
        assert!(matches!(QuoteRequest::parse(".BO"), Err(QuoteError::Validation(_))));
        assert!(matches!(QuoteRequest::parse("TCS:XYZ"), Err(QuoteError::Validation(_))));
        assert!(matches!(
            QuoteRequest::parse("<script>"),
            Err(QuoteError::Validation(_))
        ));
        assert!(matches!(
            QuoteRequest::parse("ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
            Err(QuoteError::Validation(_))
        ));
    }

    #[test]
    fn test_search_order_puts_preferred_first() {
        let req = QuoteRequest::parse("SBIN.BO").unwrap();
        assert_eq!(req.search_order(), vec![ExchangeCode::Bse, ExchangeCode::Nse]);

        let req = QuoteRequest::parse("SBIN").unwrap();
        assert_eq!(req.search_order(), vec![ExchangeCode::Nse, ExchangeCode::Bse]);
    }

    #[test]
    fn test_error_reason_lists_exchanges() {
        let symbol = Symbol::new("ZZZZ").unwrap();
        let mut result =
            AcquisitionResult::failed(symbol, Some(ExchangeCode::Bse), FailureReason::NotFound);
        result.searched_exchanges = vec![ExchangeCode::Nse, ExchangeCode::Bse];
        assert_eq!(
            result.error_reason().as_deref(),
            Some("ZZZZ not found on [NSE, BOM]")
        );
    }

    #[test]
    fn test_only_not_found_is_cacheable() {
        assert!(FailureReason::NotFound.is_cacheable());
        assert!(!FailureReason::ExtractionEmpty.is_cacheable());
        assert!(!FailureReason::Timeout { timeout_ms: 10 }.is_cacheable());
        assert!(!FailureReason::UpstreamBlocked("reset".into()).is_cacheable());
    }
}
