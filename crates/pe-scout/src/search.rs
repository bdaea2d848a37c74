// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Multi-exchange fallback search.
//!
//! Exchanges are tried one after another, never concurrently, so a single
//! queue job issues at most one page load at a time. Each attempt consults
//! the result cache first and writes its outcome back when it is worth
//! remembering. Consecutive page loads inside one job are spaced by the
//! fetch gap; the queue spaces loads across jobs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::ResultCache;
use crate::extraction::ExtractionEngine;
use crate::fetcher::DocumentSource;
use crate::queue::Resolver;
use crate::types::{AcquisitionResult, ExchangeCode, FailureReason, Provenance, QuoteRequest, Symbol};

/// Resolves a request by searching its exchanges in priority order.
pub struct ExchangeSearch {
    source: Arc<dyn DocumentSource>,
    engine: Arc<ExtractionEngine>,
    cache: Arc<ResultCache>,
    fetch_gap: Duration,
}

impl ExchangeSearch {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        engine: Arc<ExtractionEngine>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            source,
            engine,
            cache,
            fetch_gap: Duration::ZERO,
        }
    }

    /// Minimum pause before each page load after the first in a job.
    pub fn with_fetch_gap(mut self, gap: Duration) -> Self {
        self.fetch_gap = gap;
        self
    }

    fn cached(&self, symbol: &Symbol, exchange: ExchangeCode) -> Option<AcquisitionResult> {
        let mut hit = self.cache.get(symbol, exchange)?;
        hit.provenance = Provenance::Cache;
        tracing::debug!(%symbol, %exchange, "cache hit");
        Some(hit)
    }

    /// Fetch and extract one exchange, remembering the outcome if cacheable.
    async fn fetch_live(&self, symbol: &Symbol, exchange: ExchangeCode) -> AcquisitionResult {
        let result = self.fetch_and_extract(symbol, exchange).await;
        let cacheable = result.success
            || result
                .failure
                .as_ref()
                .is_some_and(FailureReason::is_cacheable);
        if cacheable {
            self.cache.put(symbol, exchange, result.clone());
        }
        result
    }

    async fn fetch_and_extract(&self, symbol: &Symbol, exchange: ExchangeCode) -> AcquisitionResult {
        let page = match self.source.fetch(symbol, exchange).await {
            Ok(page) => page,
            Err(reason) => {
                tracing::warn!(%symbol, %exchange, "attempt failed: {reason}");
                return AcquisitionResult::failed(symbol.clone(), Some(exchange), reason);
            }
        };

        // scraper's DOM is not Send, so parse and walk it off the runtime.
        let engine = Arc::clone(&self.engine);
        let extraction = match tokio::task::spawn_blocking(move || engine.extract(&page)).await {
            Ok(extraction) => extraction,
            Err(e) => {
                let reason = FailureReason::Internal(format!("extraction task failed: {e}"));
                tracing::warn!(%symbol, %exchange, "attempt failed: {reason}");
                return AcquisitionResult::failed(symbol.clone(), Some(exchange), reason);
            }
        };

        if extraction.is_empty() {
            tracing::warn!(%symbol, %exchange, "page loaded but no figures matched");
            return AcquisitionResult::failed(
                symbol.clone(),
                Some(exchange),
                FailureReason::ExtractionEmpty,
            );
        }

        tracing::info!(
            %symbol,
            %exchange,
            pe_ratio = ?extraction.pe_ratio,
            latest_earnings = ?extraction.latest_earnings,
            "figures extracted"
        );
        AcquisitionResult::found(
            symbol.clone(),
            exchange,
            extraction.pe_ratio,
            extraction.latest_earnings,
        )
    }
}

#[async_trait]
impl Resolver for ExchangeSearch {
    async fn resolve(&self, request: &QuoteRequest) -> AcquisitionResult {
        let symbol = &request.symbol;
        let mut searched = Vec::new();
        let mut worst: Option<FailureReason> = None;
        let mut fetched = false;

        for exchange in request.search_order() {
            searched.push(exchange);
            let mut result = match self.cached(symbol, exchange) {
                Some(hit) => hit,
                None => {
                    if fetched && !self.fetch_gap.is_zero() {
                        tracing::debug!(%symbol, %exchange, gap = ?self.fetch_gap, "spacing page loads");
                        tokio::time::sleep(self.fetch_gap).await;
                    }
                    fetched = true;
                    self.fetch_live(symbol, exchange).await
                }
            };
            if result.success {
                result.searched_exchanges = searched;
                return result;
            }
            if let Some(reason) = result.failure {
                if worst.as_ref().map_or(true, |w| reason.severity() > w.severity()) {
                    worst = Some(reason);
                }
            }
        }

        let mut failed = AcquisitionResult::failed(
            symbol.clone(),
            searched.last().copied(),
            worst.unwrap_or(FailureReason::NotFound),
        );
        failed.searched_exchanges = searched;
        if let Some(reason) = failed.error_reason() {
            tracing::warn!("{reason}");
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::RenderedPage;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const PE_PAGE: &str = r#"<table><tr><td>P/E ratio</td><td>18.69</td></tr>
        <tr><td>Diluted EPS</td><td>₹22.13</td></tr></table>"#;

    struct ScriptedSource {
        outcomes: HashMap<ExchangeCode, Result<RenderedPage, FailureReason>>,
        calls: Mutex<Vec<ExchangeCode>>,
        starts: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedSource {
        fn new(outcomes: Vec<(ExchangeCode, Result<&str, FailureReason>)>) -> Arc<Self> {
            let outcomes = outcomes
                .into_iter()
                .map(|(ex, outcome)| {
                    (ex, outcome.map(|html| RenderedPage::from_html("https://example.com", html)))
                })
                .collect();
            Arc::new(Self {
                outcomes,
                calls: Mutex::new(Vec::new()),
                starts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<ExchangeCode> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentSource for ScriptedSource {
        async fn fetch(
            &self,
            _symbol: &Symbol,
            exchange: ExchangeCode,
        ) -> Result<RenderedPage, FailureReason> {
            self.calls.lock().unwrap().push(exchange);
            self.starts.lock().unwrap().push(tokio::time::Instant::now());
            self.outcomes
                .get(&exchange)
                .cloned()
                .unwrap_or(Err(FailureReason::NotFound))
        }
    }

    fn search(source: Arc<ScriptedSource>, cache: Arc<ResultCache>) -> ExchangeSearch {
        ExchangeSearch::new(source, Arc::new(ExtractionEngine::default()), cache)
    }

    fn cache() -> Arc<ResultCache> {
        Arc::new(ResultCache::new(Duration::from_secs(600)))
    }

    fn request(raw: &str) -> QuoteRequest {
        QuoteRequest::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_falls_back_to_second_exchange() {
        let source = ScriptedSource::new(vec![
            (ExchangeCode::Nse, Err(FailureReason::NotFound)),
            (ExchangeCode::Bse, Ok(PE_PAGE)),
        ]);
        let result = search(source.clone(), cache()).resolve(&request("AFFLE")).await;

        assert!(result.success);
        assert_eq!(result.exchange, Some(ExchangeCode::Bse));
        assert_eq!(result.pe_ratio.as_deref(), Some("18.69"));
        assert_eq!(result.latest_earnings.as_deref(), Some("₹22.13"));
        assert_eq!(result.searched_exchanges, vec![ExchangeCode::Nse, ExchangeCode::Bse]);
        assert_eq!(source.calls(), vec![ExchangeCode::Nse, ExchangeCode::Bse]);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let source = ScriptedSource::new(vec![(ExchangeCode::Nse, Ok(PE_PAGE))]);
        let result = search(source.clone(), cache()).resolve(&request("TCS")).await;
        assert!(result.success);
        assert_eq!(source.calls(), vec![ExchangeCode::Nse]);
    }

    #[tokio::test]
    async fn test_preferred_exchange_goes_first() {
        let source = ScriptedSource::new(vec![(ExchangeCode::Bse, Ok(PE_PAGE))]);
        let result = search(source.clone(), cache()).resolve(&request("TCS.BO")).await;
        assert!(result.success);
        assert_eq!(source.calls(), vec![ExchangeCode::Bse]);
    }

    #[tokio::test]
    async fn test_all_failed_lists_every_exchange() {
        let source = ScriptedSource::new(vec![]);
        let result = search(source, cache()).resolve(&request("ZZZZ")).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureReason::NotFound));
        assert_eq!(result.searched_exchanges, vec![ExchangeCode::Nse, ExchangeCode::Bse]);
        assert_eq!(
            result.error_reason().as_deref(),
            Some("ZZZZ not found on [NSE, BOM]")
        );
    }

    #[tokio::test]
    async fn test_aggregate_reason_is_most_severe() {
        let source = ScriptedSource::new(vec![
            (ExchangeCode::Nse, Err(FailureReason::Timeout { timeout_ms: 30_000 })),
            (ExchangeCode::Bse, Err(FailureReason::NotFound)),
        ]);
        let result = search(source, cache()).resolve(&request("SLOW")).await;
        assert_eq!(result.failure, Some(FailureReason::Timeout { timeout_ms: 30_000 }));

        let source = ScriptedSource::new(vec![
            (ExchangeCode::Nse, Ok("<p>Markets are closed.</p>")),
            (ExchangeCode::Bse, Err(FailureReason::NotFound)),
        ]);
        let result = search(source, cache()).resolve(&request("EMPTY")).await;
        assert_eq!(result.failure, Some(FailureReason::ExtractionEmpty));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let shared = cache();
        let source = ScriptedSource::new(vec![(ExchangeCode::Nse, Ok(PE_PAGE))]);
        let resolver = search(source.clone(), Arc::clone(&shared));

        let first = resolver.resolve(&request("HDFCBANK")).await;
        let second = resolver.resolve(&request("HDFCBANK")).await;

        assert_eq!(source.calls().len(), 1);
        assert_eq!(first.provenance, Provenance::Live);
        assert_eq!(second.provenance, Provenance::Cache);
        assert_eq!(first.pe_ratio, second.pe_ratio);
        assert_eq!(first.fetched_at, second.fetched_at);
    }

    #[tokio::test]
    async fn test_not_found_is_cached_but_transient_failures_are_not() {
        let shared = cache();
        let source = ScriptedSource::new(vec![
            (ExchangeCode::Nse, Err(FailureReason::NotFound)),
            (ExchangeCode::Bse, Err(FailureReason::UpstreamBlocked("reset".into()))),
        ]);
        let resolver = search(source.clone(), Arc::clone(&shared));

        resolver.resolve(&request("FLAKY")).await;
        resolver.resolve(&request("FLAKY")).await;

        assert_eq!(
            source.calls(),
            vec![ExchangeCode::Nse, ExchangeCode::Bse, ExchangeCode::Bse]
        );
        assert_eq!(shared.len(), 1);
    }

    #[tokio::test]
    async fn test_extraction_empty_is_not_cached() {
        let shared = cache();
        let source = ScriptedSource::new(vec![
            (ExchangeCode::Nse, Ok("<p>Loading…</p>")),
            (ExchangeCode::Bse, Ok("<p>Loading…</p>")),
        ]);
        let resolver = search(source.clone(), Arc::clone(&shared));
        resolver.resolve(&request("BLANK")).await;
        resolver.resolve(&request("BLANK")).await;
        assert_eq!(source.calls().len(), 4);
        assert!(shared.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_exchange_waits_for_fetch_gap() {
        let gap = Duration::from_millis(200);
        let source = ScriptedSource::new(vec![
            (ExchangeCode::Nse, Err(FailureReason::NotFound)),
            (ExchangeCode::Bse, Ok(PE_PAGE)),
        ]);
        let resolver = search(source.clone(), cache()).with_fetch_gap(gap);

        let result = resolver.resolve(&request("AFFLE")).await;
        assert!(result.success);

        let starts = source.starts.lock().unwrap().clone();
        assert_eq!(starts.len(), 2);
        assert!(starts[1].duration_since(starts[0]) >= gap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_does_not_wait_for_fetch_gap() {
        let shared = cache();
        let source = ScriptedSource::new(vec![
            (ExchangeCode::Nse, Err(FailureReason::NotFound)),
            (ExchangeCode::Bse, Ok(PE_PAGE)),
        ]);
        let resolver =
            search(source.clone(), Arc::clone(&shared)).with_fetch_gap(Duration::from_secs(5));
        resolver.resolve(&request("AFFLE")).await;

        // Both outcomes are now cached, so nothing is fetched and nothing waits.
        let started = tokio::time::Instant::now();
        let again = resolver.resolve(&request("AFFLE")).await;
        assert_eq!(again.provenance, Provenance::Cache);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(source.calls().len(), 2);
    }
}
