// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Page fetcher: loads one quote page for one (symbol, exchange) pair.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use url::Url;

use crate::config::PipelineConfig;
use crate::error::{QuoteError, QuoteResult};
use crate::extraction::selectors::{Rules, RULES};
use crate::extraction::RenderedPage;
use crate::renderer::{RenderContext, RenderError, RenderResult, Renderer};
use crate::types::{ExchangeCode, FailureReason, Symbol};

/// Upper bound on releasing a page once the load has finished or timed out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can produce a rendered quote page.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load the quote page for `symbol` on `exchange`.
    ///
    /// Not-found pages are reported as [`FailureReason::NotFound`], never as
    /// a page.
    async fn fetch(
        &self,
        symbol: &Symbol,
        exchange: ExchangeCode,
    ) -> Result<RenderedPage, FailureReason>;

    /// Whether a real browser backs this source.
    fn is_live(&self) -> bool {
        true
    }
}

/// [`DocumentSource`] backed by a headless browser.
pub struct BrowserFetcher {
    renderer: Arc<dyn Renderer>,
    base_url: Url,
    home_url: String,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl BrowserFetcher {
    pub fn new(renderer: Arc<dyn Renderer>, config: &PipelineConfig) -> QuoteResult<Self> {
        let base_url = Url::parse(&config.quote_base_url).map_err(|e| {
            QuoteError::Internal(format!(
                "invalid quote base URL {:?}: {e}",
                config.quote_base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(QuoteError::Internal(format!(
                "quote base URL {:?} cannot take a path",
                config.quote_base_url
            )));
        }
        // The provider's landing page, one level above the quote path.
        let home_url = base_url
            .join("./")
            .map(String::from)
            .unwrap_or_else(|_| base_url.to_string());

        Ok(Self {
            renderer,
            base_url,
            home_url,
            navigation_timeout: config.navigation_timeout,
            settle_delay: config.settle_delay,
        })
    }

    /// `{base}/{SYMBOL}:{CODE}`
    pub fn quote_url(&self, symbol: &Symbol, exchange: ExchangeCode) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&format!("{}:{}", symbol, exchange.host_code()));
        }
        url
    }

    pub fn home_url(&self) -> &str {
        &self.home_url
    }

    /// Navigate, let scripts settle, then snapshot title, URL and content.
    async fn load(
        &self,
        ctx: &mut dyn RenderContext,
        url: &str,
        timeout_ms: u64,
    ) -> RenderResult<RenderedPage> {
        if let Err(e) = ctx.block_heavy_resources().await {
            tracing::warn!("sub-resource blocking unavailable: {e}");
        }

        let nav = ctx.navigate(url, timeout_ms).await?;
        tokio::time::sleep(self.settle_delay).await;

        let title = ctx.title().await?;
        let final_url = ctx.get_url().await.unwrap_or(nav.final_url);
        let html = ctx.get_html().await?;
        let body_text = match ctx.body_text().await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("innerText unavailable, deriving from HTML: {e}");
                None
            }
        };

        Ok(RenderedPage {
            url: final_url,
            title,
            html,
            body_text,
        })
    }
}

#[async_trait]
impl DocumentSource for BrowserFetcher {
    async fn fetch(
        &self,
        symbol: &Symbol,
        exchange: ExchangeCode,
    ) -> Result<RenderedPage, FailureReason> {
        let url = self.quote_url(symbol, exchange);
        let timeout_ms = self.navigation_timeout.as_millis() as u64;
        tracing::info!(%symbol, %exchange, %url, "fetching quote page");

        // Opening the page and loading it share one deadline.
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.navigation_timeout;

        let mut ctx = match tokio::time::timeout_at(deadline, self.renderer.new_context()).await {
            Ok(opened) => opened.map_err(failure_from_render)?,
            Err(_) => {
                tracing::warn!(%symbol, %exchange, "timed out opening a browser page");
                return Err(FailureReason::Timeout { timeout_ms });
            }
        };

        let loaded = tokio::time::timeout_at(
            deadline,
            self.load(ctx.as_mut(), url.as_str(), timeout_ms),
        )
        .await;

        match tokio::time::timeout(CLOSE_TIMEOUT, ctx.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("failed to close page context: {e}"),
            Err(_) => tracing::warn!(%symbol, %exchange, "page close did not finish, abandoning it"),
        }

        let page = match loaded {
            Ok(result) => result.map_err(failure_from_render)?,
            Err(_) => return Err(FailureReason::Timeout { timeout_ms }),
        };

        if let Some(why) = detect_not_found(&page, symbol, &self.home_url) {
            tracing::info!(%symbol, %exchange, why, "quote page reports no such symbol");
            return Err(FailureReason::NotFound);
        }

        tracing::info!(
            %symbol,
            %exchange,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "quote page loaded"
        );
        Ok(page)
    }

    fn is_live(&self) -> bool {
        self.renderer.is_available()
    }
}

/// Decide whether a loaded page is the provider's "no such quote" answer.
///
/// Returns a short description of the rule that fired.
pub fn detect_not_found(page: &RenderedPage, symbol: &Symbol, home_url: &str) -> Option<&'static str> {
    let rules: &'static Rules = &RULES;
    let config = &rules.config.not_found;

    if !home_url.is_empty() && page.url.trim_end_matches('/') == home_url.trim_end_matches('/') {
        return Some("redirected to homepage");
    }

    if !config.home_title.is_empty()
        && page.title.contains(config.home_title.as_str())
        && !page.title.to_uppercase().contains(symbol.as_str())
    {
        return Some("generic provider title");
    }

    let text = page.visible_text().to_lowercase();
    config
        .markers
        .iter()
        .map(String::as_str)
        .find(|marker| text.contains(*marker))
}

fn failure_from_render(err: RenderError) -> FailureReason {
    match err {
        RenderError::Timeout { timeout_ms } => FailureReason::Timeout { timeout_ms },
        other => FailureReason::UpstreamBlocked(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{NavigationResult, NoopRenderer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Behaviour {
        Serve {
            final_url: Option<String>,
            title: String,
            html: String,
        },
        Hang,
        HangOnOpen,
        HangOnClose,
        Refuse,
    }

    struct FakeRenderer {
        behaviour: Behaviour,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
        visited: Arc<Mutex<Vec<String>>>,
    }

    impl FakeRenderer {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
                visited: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
            if matches!(self.behaviour, Behaviour::HangOnOpen) {
                std::future::pending::<()>().await;
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeContext {
                behaviour: self.behaviour.clone(),
                url: String::new(),
                closed: Arc::clone(&self.closed),
                visited: Arc::clone(&self.visited),
            }))
        }

        fn active_contexts(&self) -> usize {
            self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
        }
    }

    struct FakeContext {
        behaviour: Behaviour,
        url: String,
        closed: Arc<AtomicUsize>,
        visited: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RenderContext for FakeContext {
        async fn block_heavy_resources(&mut self) -> RenderResult<()> {
            Ok(())
        }

        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> RenderResult<NavigationResult> {
            self.visited.lock().unwrap().push(url.to_string());
            match &self.behaviour {
                Behaviour::Serve { final_url, .. } => {
                    self.url = final_url.clone().unwrap_or_else(|| url.to_string());
                    Ok(NavigationResult {
                        final_url: self.url.clone(),
                        load_time_ms: 5,
                    })
                }
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("navigation should have been cancelled")
                }
                Behaviour::HangOnClose => {
                    self.url = url.to_string();
                    Ok(NavigationResult {
                        final_url: self.url.clone(),
                        load_time_ms: 5,
                    })
                }
                Behaviour::HangOnOpen => unreachable!("no context is ever opened"),
                Behaviour::Refuse => Err(RenderError::Navigation("net::ERR_CONNECTION_RESET".into())),
            }
        }

        async fn title(&self) -> RenderResult<String> {
            match &self.behaviour {
                Behaviour::Serve { title, .. } => Ok(title.clone()),
                _ => Ok(String::new()),
            }
        }

        async fn body_text(&self) -> RenderResult<String> {
            Err(RenderError::Script("no innerText in fake".into()))
        }

        async fn get_html(&self) -> RenderResult<String> {
            match &self.behaviour {
                Behaviour::Serve { html, .. } => Ok(html.clone()),
                Behaviour::HangOnClose => Ok("<div>P/E ratio</div><div>9.10</div>".into()),
                _ => Ok(String::new()),
            }
        }

        async fn get_url(&self) -> RenderResult<String> {
            Ok(self.url.clone())
        }

        async fn close(self: Box<Self>) -> RenderResult<()> {
            if matches!(self.behaviour, Behaviour::HangOnClose) {
                std::future::pending::<()>().await;
            }
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            settle_delay: Duration::ZERO,
            navigation_timeout: Duration::from_secs(30),
            ..PipelineConfig::default()
        }
    }

    fn symbol(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    fn serve(title: &str, html: &str) -> Behaviour {
        Behaviour::Serve {
            final_url: None,
            title: title.into(),
            html: html.into(),
        }
    }

    #[test]
    fn test_quote_url_format() {
        let fetcher = BrowserFetcher::new(Arc::new(NoopRenderer), &config()).unwrap();
        assert_eq!(
            fetcher.quote_url(&symbol("HDFCBANK"), ExchangeCode::Nse).as_str(),
            "https://www.google.com/finance/quote/HDFCBANK:NSE"
        );
        assert_eq!(
            fetcher.quote_url(&symbol("M&M"), ExchangeCode::Bse).as_str(),
            "https://www.google.com/finance/quote/M&M:BOM"
        );
        assert_eq!(fetcher.home_url(), "https://www.google.com/finance/");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let cfg = PipelineConfig {
            quote_base_url: "not a url".into(),
            ..config()
        };
        let err = BrowserFetcher::new(Arc::new(NoopRenderer), &cfg).err();
        assert!(matches!(err, Some(QuoteError::Internal(_))));
    }

    #[tokio::test]
    async fn test_fetch_returns_page_and_closes_context() {
        let renderer = Arc::new(FakeRenderer::new(serve(
            "HDFC Bank Ltd (HDFCBANK) Stock Price & News - Google Finance",
            "<div>P/E ratio</div><div>18.69</div>",
        )));
        let visited = Arc::clone(&renderer.visited);
        let fetcher = BrowserFetcher::new(renderer.clone(), &config()).unwrap();

        let page = tokio_test::assert_ok!(fetcher.fetch(&symbol("HDFCBANK"), ExchangeCode::Nse).await);
        assert_eq!(page.url, "https://www.google.com/finance/quote/HDFCBANK:NSE");
        assert!(page.html.contains("18.69"));
        assert!(page.body_text.is_none());
        assert_eq!(renderer.active_contexts(), 0);
        assert_eq!(
            visited.lock().unwrap().as_slice(),
            ["https://www.google.com/finance/quote/HDFCBANK:NSE".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_navigation_times_out_and_releases() {
        let renderer = Arc::new(FakeRenderer::new(Behaviour::Hang));
        let fetcher = BrowserFetcher::new(renderer.clone(), &config()).unwrap();

        let err = fetcher
            .fetch(&symbol("TCS"), ExchangeCode::Nse)
            .await
            .unwrap_err();
        assert_eq!(err, FailureReason::Timeout { timeout_ms: 30_000 });
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_page_open_times_out() {
        let renderer = Arc::new(FakeRenderer::new(Behaviour::HangOnOpen));
        let fetcher = BrowserFetcher::new(renderer.clone(), &config()).unwrap();

        let started = tokio::time::Instant::now();
        let err = tokio_test::assert_err!(fetcher.fetch(&symbol("INFY"), ExchangeCode::Nse).await);
        assert_eq!(err, FailureReason::Timeout { timeout_ms: 30_000 });
        assert!(started.elapsed() <= Duration::from_secs(30));
        assert_eq!(renderer.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_page_close_is_abandoned() {
        let renderer = Arc::new(FakeRenderer::new(Behaviour::HangOnClose));
        let fetcher = BrowserFetcher::new(renderer.clone(), &config()).unwrap();

        let started = tokio::time::Instant::now();
        let page = tokio_test::assert_ok!(fetcher.fetch(&symbol("INFY"), ExchangeCode::Nse).await);
        assert!(page.html.contains("9.10"));
        assert!(started.elapsed() <= CLOSE_TIMEOUT);
    }

    #[tokio::test]
    async fn test_redirect_to_homepage_is_not_found() {
        let renderer = Arc::new(FakeRenderer::new(Behaviour::Serve {
            final_url: Some("https://www.google.com/finance/".into()),
            title: "Google Finance - Stock Market Prices".into(),
            html: "<div>Markets</div>".into(),
        }));
        let fetcher = BrowserFetcher::new(renderer.clone(), &config()).unwrap();
        let err = fetcher
            .fetch(&symbol("ZZZZ"), ExchangeCode::Nse)
            .await
            .unwrap_err();
        assert_eq!(err, FailureReason::NotFound);
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test]
    async fn test_body_marker_is_not_found() {
        let renderer = Arc::new(FakeRenderer::new(serve(
            "ZZZZ",
            "<p>We couldn't find any match for your search.</p>",
        )));
        let fetcher = BrowserFetcher::new(renderer, &config()).unwrap();
        let err = fetcher
            .fetch(&symbol("ZZZZ"), ExchangeCode::Bse)
            .await
            .unwrap_err();
        assert_eq!(err, FailureReason::NotFound);
    }

    #[tokio::test]
    async fn test_navigation_error_is_upstream_blocked() {
        let renderer = Arc::new(FakeRenderer::new(Behaviour::Refuse));
        let fetcher = BrowserFetcher::new(renderer.clone(), &config()).unwrap();
        let err = tokio_test::assert_err!(fetcher.fetch(&symbol("TCS"), ExchangeCode::Nse).await);
        assert!(matches!(err, FailureReason::UpstreamBlocked(ref m) if m.contains("ERR_CONNECTION_RESET")));
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test]
    async fn test_missing_browser_is_upstream_blocked() {
        let fetcher = BrowserFetcher::new(Arc::new(NoopRenderer), &config()).unwrap();
        assert!(!fetcher.is_live());
        let err = fetcher
            .fetch(&symbol("TCS"), ExchangeCode::Nse)
            .await
            .unwrap_err();
        assert!(matches!(err, FailureReason::UpstreamBlocked(_)));
    }

    #[test]
    fn test_detect_not_found_rules() {
        let home = "https://www.google.com/finance/";
        let sym = symbol("HDFCBANK");

        let ok = RenderedPage::from_html(
            "https://www.google.com/finance/quote/HDFCBANK:NSE",
            "<title>HDFC Bank Ltd (HDFCBANK) Stock Price &amp; News - Google Finance</title><div>P/E ratio 18.69</div>",
        );
        assert_eq!(detect_not_found(&ok, &sym, home), None);

        let generic = RenderedPage::from_html(
            "https://www.google.com/finance/quote/HDFCBANK:BOM",
            "<title>Google Finance - Stock Market Prices</title>",
        );
        assert_eq!(detect_not_found(&generic, &sym, home), Some("generic provider title"));

        let marker = RenderedPage {
            body_text: Some("Quote Not Found".into()),
            ..ok.clone()
        };
        assert_eq!(detect_not_found(&marker, &sym, home), Some("quote not found"));
    }
}
