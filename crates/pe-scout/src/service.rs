// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Composition root: wires the static table, queue, search, cache and
//! fetcher into a single `quote` entry point.

use std::sync::Arc;

use crate::cache::ResultCache;
use crate::config::PipelineConfig;
use crate::error::{QuoteError, QuoteResult};
use crate::extraction::ExtractionEngine;
use crate::fallback::StaticTable;
use crate::fetcher::{BrowserFetcher, DocumentSource};
use crate::queue::RequestQueue;
use crate::renderer::Renderer;
use crate::search::ExchangeSearch;
use crate::types::{AcquisitionResult, Quote, QuoteRequest};

/// The quote-acquisition pipeline behind one handle.
pub struct QuoteService {
    config: PipelineConfig,
    cache: Arc<ResultCache>,
    queue: RequestQueue,
    table: StaticTable,
    source: Arc<dyn DocumentSource>,
}

impl QuoteService {
    /// Build the pipeline over any page source.
    pub fn new(config: PipelineConfig, source: Arc<dyn DocumentSource>) -> Self {
        let cache = Arc::new(ResultCache::new(config.cache_ttl));
        let search = ExchangeSearch::new(
            Arc::clone(&source),
            Arc::new(ExtractionEngine::default()),
            Arc::clone(&cache),
        )
        .with_fetch_gap(config.request_delay);
        let queue = RequestQueue::new(Arc::new(search), config.request_delay);

        Self {
            config,
            cache,
            queue,
            table: StaticTable::embedded(),
            source,
        }
    }

    /// Build the pipeline over a browser renderer.
    pub fn with_renderer(config: PipelineConfig, renderer: Arc<dyn Renderer>) -> QuoteResult<Self> {
        let fetcher = BrowserFetcher::new(renderer, &config)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Replace the embedded static table.
    pub fn with_static_table(mut self, table: StaticTable) -> Self {
        self.table = table;
        self
    }

    /// Look up figures for caller input such as `HDFCBANK` or `TCS.BO`.
    pub async fn quote(&self, raw: &str) -> QuoteResult<Quote> {
        let request = QuoteRequest::parse(raw)?;
        self.quote_request(request).await
    }

    pub async fn quote_request(&self, request: QuoteRequest) -> QuoteResult<Quote> {
        if self.config.static_first {
            if let Some(quote) = self.table.lookup(&request.symbol) {
                tracing::info!(symbol = %request.symbol, "served from static table");
                return Ok(quote);
            }
        }

        let symbol = request.symbol.clone();
        match self.acquire(request).await {
            Ok(result) => Ok(self.fill_from_table(Quote::from(result))),
            Err(err) => match self.table.lookup(&symbol) {
                Some(quote) => {
                    tracing::warn!(%symbol, "live lookup failed ({err}); serving static figures");
                    Ok(quote)
                }
                None => Err(err),
            },
        }
    }

    /// Run a request through the throttled queue, bounded by the configured
    /// wait. A job abandoned here still runs to completion in the queue.
    pub async fn acquire(&self, request: QuoteRequest) -> QuoteResult<AcquisitionResult> {
        let symbol = request.symbol.clone();
        match tokio::time::timeout(self.config.queue_wait, self.queue.enqueue(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    %symbol,
                    wait_secs = self.config.queue_wait.as_secs(),
                    "gave up waiting on the request queue"
                );
                Err(QuoteError::Timeout {
                    symbol,
                    searched: Vec::new(),
                })
            }
        }
    }

    /// Complete a partial live quote with whatever the static table knows.
    fn fill_from_table(&self, mut quote: Quote) -> Quote {
        let Some(entry) = self.table.get(&quote.symbol) else {
            return quote;
        };
        if quote.pe_ratio.is_none() && entry.pe_ratio.is_some() {
            tracing::debug!(symbol = %quote.symbol, "P/E ratio taken from static table");
            quote.pe_ratio = entry.pe_ratio.clone();
        }
        if quote.latest_earnings.is_none() && entry.latest_earnings.is_some() {
            tracing::debug!(symbol = %quote.symbol, "latest earnings taken from static table");
            quote.latest_earnings = entry.latest_earnings.clone();
        }
        quote
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn pending_jobs(&self) -> usize {
        self.queue.pending()
    }

    /// Whether live lookups can reach a browser.
    pub fn is_live(&self) -> bool {
        self.source.is_live()
    }
}
