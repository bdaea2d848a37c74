// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Selector, keyword and marker configuration for the extraction cascade.
//!
//! The configuration is embedded at compile time from `selectors.json` so
//! the heuristics can be retuned for a new upstream template without
//! touching code. Selector strings are kept as text and parsed per document
//! (see [`CompiledSelectors`]) because `scraper` parsing is cheap and the
//! parsed types are not shared across threads.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use serde::Deserialize;

/// Raw JSON content of the selector configuration file, embedded at compile
/// time so there is no runtime file I/O.
const SELECTORS_JSON: &str = include_str!("selectors.json");

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorConfig {
    pub statistics: StatisticsConfig,
    pub grid: GridConfig,
    pub labels: LabelConfig,
    pub earnings_patterns: Vec<String>,
    pub not_found: NotFoundConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsConfig {
    /// Container selectors in priority order.
    pub containers: Vec<String>,
    /// Elements scanned for keywords when no container selector matches.
    pub container_fallback: String,
    pub rows: String,
    /// Value-cell selectors in priority order.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridConfig {
    pub tables: String,
    pub cells: String,
    /// How many cells after a label cell may hold its value.
    pub lookahead: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelConfig {
    pub pe_ratio: Vec<String>,
    pub earnings: Vec<String>,
    pub pe_ratio_cell: Vec<String>,
    pub earnings_cell: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotFoundConfig {
    /// Title of the provider's generic landing page.
    pub home_title: String,
    /// Lowercase body-text phrases shown on "no such quote" pages.
    pub markers: Vec<String>,
}

/// Keywords matched on word boundaries, case-insensitively.
#[derive(Debug, Clone)]
pub struct LabelSet {
    patterns: Vec<Regex>,
}

impl LabelSet {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let patterns = keywords
            .iter()
            .filter_map(|kw| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(kw.as_ref().trim()));
                Regex::new(&pattern)
                    .map_err(|e| tracing::warn!("skipping label {:?}: {e}", kw.as_ref()))
                    .ok()
            })
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}

/// Parsed configuration plus the regex-backed pieces, built once per process.
pub struct Rules {
    pub config: SelectorConfig,
    pub pe_labels: LabelSet,
    pub earnings_labels: LabelSet,
    pub pe_cell_labels: LabelSet,
    pub earnings_cell_labels: LabelSet,
    pub earnings_patterns: Vec<Regex>,
}

impl Rules {
    fn from_config(config: SelectorConfig) -> Self {
        let earnings_patterns = config
            .earnings_patterns
            .iter()
            .filter_map(|p| {
                Regex::new(p)
                    .map_err(|e| tracing::warn!("skipping earnings pattern {p:?}: {e}"))
                    .ok()
            })
            .collect();

        Self {
            pe_labels: LabelSet::new(config.labels.pe_ratio.as_slice()),
            earnings_labels: LabelSet::new(config.labels.earnings.as_slice()),
            pe_cell_labels: LabelSet::new(config.labels.pe_ratio_cell.as_slice()),
            earnings_cell_labels: LabelSet::new(config.labels.earnings_cell.as_slice()),
            earnings_patterns,
            config,
        }
    }
}

/// Process-wide rules parsed from the embedded JSON.
pub static RULES: LazyLock<Rules> = LazyLock::new(|| {
    let config = serde_json::from_str(SELECTORS_JSON).unwrap_or_else(|e| {
        tracing::error!("embedded selectors.json is invalid, heuristics disabled: {e}");
        SelectorConfig::default()
    });
    Rules::from_config(config)
});

/// CSS selectors parsed for one document.
pub struct CompiledSelectors {
    pub containers: Vec<Selector>,
    pub container_fallback: Option<Selector>,
    pub rows: Option<Selector>,
    pub values: Vec<Selector>,
    pub grid_tables: Option<Selector>,
    pub grid_cells: Option<Selector>,
}

impl CompiledSelectors {
    pub fn compile(config: &SelectorConfig) -> Self {
        Self {
            containers: config.statistics.containers.iter().filter_map(|s| parse(s)).collect(),
            container_fallback: parse(&config.statistics.container_fallback),
            rows: parse(&config.statistics.rows),
            values: config.statistics.values.iter().filter_map(|s| parse(s)).collect(),
            grid_tables: parse(&config.grid.tables),
            grid_cells: parse(&config.grid.cells),
        }
    }
}

fn parse(selector: &str) -> Option<Selector> {
    if selector.trim().is_empty() {
        return None;
    }
    Selector::parse(selector)
        .map_err(|e| tracing::warn!("skipping selector {selector:?}: {e:?}"))
        .ok()
}
