// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Result caching keyed by `(symbol, exchange)`.
//!
//! ## Expiry
//!
//! Entries are never swept in the background. A lookup treats anything at
//! least `ttl` old as a miss, and `cleanup_expired` can be called to reclaim
//! memory.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::types::{AcquisitionResult, ExchangeCode, Symbol};

/// Cache key: one symbol on one exchange.
pub type CacheKey = (Symbol, ExchangeCode);

/// Cached outcome with its creation time.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: AcquisitionResult,
    created_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// Process-local, unbounded result cache.
///
/// Entries are replaced whole on `put`, so readers never observe a partially
/// written result.
#[derive(Debug)]
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fetch a fresh result for the key, if any.
    pub fn get(&self, symbol: &Symbol, exchange: ExchangeCode) -> Option<AcquisitionResult> {
        let key = (symbol.clone(), exchange);
        let entry = self.entries.get(&key)?;
        if entry.is_fresh(self.ttl) {
            tracing::debug!("cache hit: {symbol}:{exchange}");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store a result, replacing whatever was there.
    pub fn put(&self, symbol: &Symbol, exchange: ExchangeCode, value: AcquisitionResult) {
        self.entries.insert(
            (symbol.clone(), exchange),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for a key.
    pub fn invalidate(&self, symbol: &Symbol, exchange: ExchangeCode) {
        self.entries.remove(&(symbol.clone(), exchange));
    }

    /// Remove all expired entries.
    pub fn cleanup_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
    }

    /// Number of stored entries (including expired).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
