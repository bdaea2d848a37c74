// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! PE Scout: throttled, cached, best-effort acquisition of P/E ratio and
//! earnings figures from rendered quote pages.

pub mod cache;
pub mod config;
pub mod error;
pub mod extraction;
pub mod fallback;
pub mod fetcher;
pub mod queue;
pub mod renderer;
pub mod search;
pub mod service;
pub mod types;

pub use cache::ResultCache;
pub use config::PipelineConfig;
pub use error::{QuoteError, QuoteResult};
pub use extraction::{Extraction, ExtractionEngine, RenderedPage};
pub use fallback::{FallbackEntry, StaticTable};
pub use fetcher::{BrowserFetcher, DocumentSource};
pub use queue::{RequestQueue, Resolver};
pub use renderer::chromium::ChromiumRenderer;
pub use renderer::{NoopRenderer, RenderContext, RenderError, Renderer};
pub use search::ExchangeSearch;
pub use service::QuoteService;
pub use types::*;
