// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors raised by a browser engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("browser not available: {0}")]
    Unavailable(String),

    #[error("navigation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("page script failed: {0}")]
    Script(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
    /// Whether a real browser backs this renderer.
    fn is_available(&self) -> bool {
        true
    }
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Refuse image, stylesheet and font loads for the rest of this context.
    async fn block_heavy_resources(&mut self) -> RenderResult<()>;
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> RenderResult<NavigationResult>;
    /// Document title.
    async fn title(&self) -> RenderResult<String>;
    /// Rendered visible text of the body (`innerText`).
    async fn body_text(&self) -> RenderResult<String>;
    /// Get the full page HTML.
    async fn get_html(&self) -> RenderResult<String>;
    /// Get the current URL.
    async fn get_url(&self) -> RenderResult<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> RenderResult<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Every fetch fails with `Unavailable`, which the pipeline reports as an
/// upstream failure; static fallback entries keep working.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
        Err(RenderError::Unavailable(
            "Chromium not installed; live quotes disabled".into(),
        ))
    }
    fn active_contexts(&self) -> usize {
        0
    }
    fn is_available(&self) -> bool {
        false
    }
}
