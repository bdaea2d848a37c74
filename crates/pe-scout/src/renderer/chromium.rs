// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, RenderError, RenderResult, Renderer};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/120.0.0.0 Safari/537.36";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. PE_SCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("PE_SCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.cache/pe-scout/chromium/
    if let Some(cache) = dirs::cache_dir() {
        let root = cache.join("pe-scout").join("chromium");
        let candidates = if cfg!(target_os = "macos") {
            vec![
                root.join("chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                root.join("chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                root.join("chrome"),
            ]
        } else {
            vec![root.join("chrome-linux64/chrome"), root.join("chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    ["google-chrome", "chromium", "chromium-browser"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

/// Chromium-based renderer. One browser process, one tab per context.
pub struct ChromiumRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Create a new ChromiumRenderer, launching a headless Chromium instance.
    pub async fn new() -> RenderResult<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            RenderError::Unavailable("Chromium not found; set PE_SCOUT_CHROMIUM_PATH".into())
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1366, 768)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| RenderError::Unavailable(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Unavailable(format!("failed to launch Chromium: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("chromium handler event error: {e}");
                }
            }
        });

        tracing::info!("headless Chromium launched");

        Ok(Self {
            browser,
            handler_task,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Unavailable(format!("failed to create new page: {e}")))?;

        if let Err(e) = page.set_user_agent(USER_AGENT).await {
            tracing::debug!("could not set user agent: {e}");
        }

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            interceptor: None,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    interceptor: Option<JoinHandle<()>>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn eval_string(&self, script: &str) -> RenderResult<String> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| RenderError::Script(format!("failed to convert JS result: {e}")))
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn block_heavy_resources(&mut self) -> RenderResult<()> {
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| RenderError::Navigation(format!("request interception: {e}")))?;

        // Only these resource types are paused, so every paused request is
        // one to refuse.
        let patterns = [ResourceType::Image, ResourceType::Stylesheet, ResourceType::Font]
            .into_iter()
            .map(|kind| RequestPattern::builder().resource_type(kind).build())
            .collect::<Vec<_>>();

        let page = self.page.clone();
        self.interceptor = Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let refuse =
                    FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
                if let Err(e) = page.execute(refuse).await {
                    tracing::debug!("failed to block sub-resource: {e}");
                }
            }
        }));

        self.page
            .execute(EnableParams::builder().patterns(patterns).build())
            .await
            .map_err(|e| RenderError::Navigation(format!("request interception: {e}")))?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> RenderResult<NavigationResult> {
        let start = Instant::now();

        let result =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(RenderError::Navigation(e.to_string())),
            Err(_) => Err(RenderError::Timeout { timeout_ms }),
        }
    }

    async fn title(&self) -> RenderResult<String> {
        self.page
            .get_title()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| RenderError::Script(format!("failed to read title: {e}")))
    }

    async fn body_text(&self) -> RenderResult<String> {
        self.eval_string("document.body ? document.body.innerText : ''")
            .await
    }

    async fn get_html(&self) -> RenderResult<String> {
        self.eval_string("document.documentElement.outerHTML").await
    }

    async fn get_url(&self) -> RenderResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| RenderError::Script(format!("failed to get URL: {e}")))?
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(mut self: Box<Self>) -> RenderResult<()> {
        if let Some(task) = self.interceptor.take() {
            task.abort();
        }
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let page = self.page.clone();
        page.close()
            .await
            .map_err(|e| RenderError::Navigation(format!("failed to close page: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_render_and_close() {
        let renderer = ChromiumRenderer::new()
            .await
            .expect("failed to create renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");
        ctx.block_heavy_resources()
            .await
            .expect("interception failed");

        let nav = ctx
            .navigate(
                "data:text/html,<title>Quote</title><div>P/E ratio</div><div>18.69</div>",
                10000,
            )
            .await
            .expect("navigation failed");
        assert!(nav.load_time_ms < 10000);

        assert_eq!(ctx.title().await.expect("title failed"), "Quote");
        let text = ctx.body_text().await.expect("innerText failed");
        assert!(text.contains("P/E ratio"));
        assert!(text.contains("18.69"));

        let html = ctx.get_html().await.expect("get_html failed");
        assert!(html.contains("<div>18.69</div>"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);
    }
}
