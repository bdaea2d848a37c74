// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Last-known figures for a handful of symbols, served when live
//! acquisition is skipped or fails.

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::{ExchangeCode, Provenance, Quote, Symbol};

const FALLBACK_JSON: &str = include_str!("fallback.json");

#[derive(Debug, Deserialize)]
struct RawEntry {
    exchange: Option<ExchangeCode>,
    pe_ratio: Option<f64>,
    latest_earnings: Option<String>,
}

/// One hand-curated row.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackEntry {
    pub exchange: Option<ExchangeCode>,
    pub pe_ratio: Option<String>,
    pub latest_earnings: Option<String>,
}

impl From<RawEntry> for FallbackEntry {
    fn from(raw: RawEntry) -> Self {
        Self {
            exchange: raw.exchange,
            // 0 marks an unknown ratio in the curated data.
            pe_ratio: raw
                .pe_ratio
                .filter(|v| v.is_finite() && *v > 0.0)
                .map(|v| v.to_string()),
            latest_earnings: raw.latest_earnings.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Read-only table keyed by normalized symbol.
#[derive(Debug, Clone, Default)]
pub struct StaticTable {
    entries: HashMap<String, FallbackEntry>,
}

impl StaticTable {
    /// The table compiled into the binary.
    pub fn embedded() -> Self {
        Self::from_json(FALLBACK_JSON).unwrap_or_else(|e| {
            tracing::error!("embedded fallback.json is invalid, static table empty: {e}");
            Self::default()
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, RawEntry> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .map(|(symbol, entry)| (symbol.trim().to_uppercase(), FallbackEntry::from(entry)))
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&FallbackEntry> {
        self.entries.get(symbol.as_str())
    }

    /// The entry as an outbound quote, tagged `Static`.
    pub fn lookup(&self, symbol: &Symbol) -> Option<Quote> {
        let entry = self.get(symbol)?;
        tracing::debug!("static table hit: {symbol}");
        Some(Quote {
            symbol: symbol.clone(),
            exchange: entry.exchange,
            pe_ratio: entry.pe_ratio.clone(),
            latest_earnings: entry.latest_earnings.clone(),
            provenance: Provenance::Static,
            fetched_at: None,
        })
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.entries.contains_key(symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
