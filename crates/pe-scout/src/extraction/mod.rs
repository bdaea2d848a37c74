// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Extraction engine: pulls a P/E ratio and a latest-earnings figure out
//! of a rendered quote page.
//!
//! Heuristics run in a fixed order of decreasing reliability:
//! 1. Statistics rows: labelled rows in the known statistics containers
//! 2. Visible text lines: label lines with a short lookahead
//! 3. Currency patterns: currency amounts near earnings keywords
//! 4. Grid cells: positional scan of table-like elements
//!
//! The first value found per field wins. Upstream markup is unstable, so
//! every stage is best effort and an empty result is a normal outcome.

pub mod document;
pub mod heuristics;
pub mod plausibility;
pub mod selectors;

pub use document::{Document, RenderedPage};

use serde::Serialize;

/// Which figure a heuristic produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PeRatio,
    LatestEarnings,
}

/// One ranked extraction step.
#[derive(Clone, Copy)]
pub struct Heuristic {
    pub name: &'static str,
    pub field: Field,
    pub run: fn(&Document) -> Option<String>,
}

impl std::fmt::Debug for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heuristic")
            .field("name", &self.name)
            .field("field", &self.field)
            .finish()
    }
}

const DEFAULT_HEURISTICS: &[Heuristic] = &[
    Heuristic {
        name: "statistics_rows",
        field: Field::PeRatio,
        run: heuristics::pe_statistics_rows,
    },
    Heuristic {
        name: "statistics_rows",
        field: Field::LatestEarnings,
        run: heuristics::earnings_statistics_rows,
    },
    Heuristic {
        name: "visible_text_lines",
        field: Field::PeRatio,
        run: heuristics::pe_visible_text_lines,
    },
    Heuristic {
        name: "visible_text_lines",
        field: Field::LatestEarnings,
        run: heuristics::earnings_visible_text_lines,
    },
    Heuristic {
        name: "currency_patterns",
        field: Field::LatestEarnings,
        run: heuristics::earnings_currency_patterns,
    },
    Heuristic {
        name: "grid_cells",
        field: Field::PeRatio,
        run: heuristics::pe_grid_cells,
    },
    Heuristic {
        name: "grid_cells",
        field: Field::LatestEarnings,
        run: heuristics::earnings_grid_cells,
    },
];

/// Figures found on a page, with the heuristic that produced each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub pe_ratio: Option<String>,
    pub latest_earnings: Option<String>,
    pub pe_ratio_source: Option<&'static str>,
    pub latest_earnings_source: Option<&'static str>,
}

impl Extraction {
    /// Neither figure was found.
    pub fn is_empty(&self) -> bool {
        self.pe_ratio.is_none() && self.latest_earnings.is_none()
    }

    fn slot(&mut self, field: Field) -> (&mut Option<String>, &mut Option<&'static str>) {
        match field {
            Field::PeRatio => (&mut self.pe_ratio, &mut self.pe_ratio_source),
            Field::LatestEarnings => (&mut self.latest_earnings, &mut self.latest_earnings_source),
        }
    }
}

/// Runs the heuristic cascade over a page.
#[derive(Debug, Clone)]
pub struct ExtractionEngine {
    heuristics: Vec<Heuristic>,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_HEURISTICS.to_vec())
    }
}

impl ExtractionEngine {
    pub fn new(heuristics: Vec<Heuristic>) -> Self {
        Self { heuristics }
    }

    pub fn heuristics(&self) -> &[Heuristic] {
        &self.heuristics
    }

    /// Extract both figures from a rendered page.
    pub fn extract(&self, page: &RenderedPage) -> Extraction {
        let doc = Document::parse(page);
        self.extract_document(&doc)
    }

    pub fn extract_document(&self, doc: &Document) -> Extraction {
        let mut out = Extraction::default();
        for heuristic in &self.heuristics {
            let (value, source) = out.slot(heuristic.field);
            if value.is_some() {
                continue;
            }
            if let Some(found) = (heuristic.run)(doc) {
                tracing::debug!(
                    heuristic = heuristic.name,
                    field = ?heuristic.field,
                    value = %found,
                    "extraction matched"
                );
                *value = Some(found);
                *source = Some(heuristic.name);
            }
        }
        if out.is_empty() {
            tracing::debug!(lines = doc.lines().len(), "no figures extracted");
        }
        out
    }
}
