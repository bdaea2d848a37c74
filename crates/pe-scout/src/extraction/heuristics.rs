// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! The individual extraction heuristics, most reliable first.
//!
//! Each one is a plain function over a [`Document`] returning the raw
//! figure text it found. Values are validated with the helpers in
//! [`super::plausibility`] before being returned.

use scraper::ElementRef;

use super::document::{element_text, Document};
use super::plausibility::{
    bounded_ratio, currency_token, earnings_value, is_placeholder, positive_ratio, ratio_in_line,
};
use super::selectors::LabelSet;

type Accept = fn(&str) -> Option<String>;

/// Lines after a label line that may still hold its value.
const LINE_LOOKAHEAD: usize = 2;

// ── statistics rows ─────────────────────────────────────────────

pub fn pe_statistics_rows(doc: &Document) -> Option<String> {
    statistics_rows(doc, &doc.rules().pe_labels, positive_ratio)
}

pub fn earnings_statistics_rows(doc: &Document) -> Option<String> {
    statistics_rows(doc, &doc.rules().earnings_labels, earnings_value)
}

/// Labelled rows inside the statistics containers.
///
/// The first row (innermost first) that carries any value cell decides the
/// outcome: a placeholder there ends this heuristic instead of letting a
/// wider row pick an unrelated figure.
fn statistics_rows(doc: &Document, labels: &LabelSet, accept: Accept) -> Option<String> {
    let selectors = doc.selectors();
    let mut containers: Vec<ElementRef<'_>> = Vec::new();
    for selector in &selectors.containers {
        for el in doc.html().select(selector) {
            if !containers.iter().any(|c| c.id() == el.id()) {
                containers.push(el);
            }
        }
    }

    if containers.is_empty() {
        if let Some(fallback) = &selectors.container_fallback {
            containers.extend(
                doc.html()
                    .select(fallback)
                    .find(|el| labels.matches(&element_text(el))),
            );
        }
    }

    for container in containers {
        let mut rows: Vec<(usize, ElementRef<'_>)> = std::iter::once(container)
            .chain(selectors.rows.iter().flat_map(|sel| container.select(sel)))
            .filter_map(|row| {
                let text = element_text(&row);
                labels.matches(&text).then_some((text.len(), row))
            })
            .collect();
        rows.sort_by_key(|(len, _)| *len);

        for (_, row) in rows {
            let cells: Vec<String> = selectors
                .values
                .iter()
                .flat_map(|sel| row.select(sel))
                .map(|cell| element_text(&cell))
                .filter(|text| !text.is_empty() && !labels.matches(text))
                .collect();
            if cells.is_empty() {
                continue;
            }
            return cells.iter().find_map(|text| accept(text));
        }
    }
    None
}

// ── visible text lines ──────────────────────────────────────────

pub fn pe_visible_text_lines(doc: &Document) -> Option<String> {
    visible_text_lines(doc, &doc.rules().pe_labels, ratio_in_line)
}

pub fn earnings_visible_text_lines(doc: &Document) -> Option<String> {
    visible_text_lines(doc, &doc.rules().earnings_labels, |line| {
        currency_token(line).or_else(|| earnings_value(line))
    })
}

/// A label line followed, on the same line or within the next two
/// non-empty lines, by a plausible value. Placeholder lines are skipped.
fn visible_text_lines(doc: &Document, labels: &LabelSet, accept: Accept) -> Option<String> {
    let lines = doc.lines();
    for (i, line) in lines.iter().enumerate() {
        if !labels.matches(line) {
            continue;
        }
        if let Some(found) = accept(line) {
            return Some(found);
        }
        let following = lines[i + 1..]
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .take(LINE_LOOKAHEAD);
        for candidate in following {
            if is_placeholder(candidate) {
                continue;
            }
            if let Some(found) = accept(candidate) {
                return Some(found);
            }
        }
    }
    None
}

// ── currency patterns ───────────────────────────────────────────

/// Currency amounts near "earnings", "EPS" or "quarterly" anywhere in the
/// visible text.
pub fn earnings_currency_patterns(doc: &Document) -> Option<String> {
    doc.rules()
        .earnings_patterns
        .iter()
        .find_map(|re| re.find(doc.text()).and_then(|m| currency_token(m.as_str())))
}

// ── grid cells ──────────────────────────────────────────────────

pub fn pe_grid_cells(doc: &Document) -> Option<String> {
    grid_cells(doc, &doc.rules().pe_cell_labels, bounded_ratio)
}

pub fn earnings_grid_cells(doc: &Document) -> Option<String> {
    grid_cells(doc, &doc.rules().earnings_cell_labels, earnings_value)
}

/// Positional scan of table-like elements: the value sits within a few
/// cells after its label cell.
fn grid_cells(doc: &Document, labels: &LabelSet, accept: Accept) -> Option<String> {
    let selectors = doc.selectors();
    let (Some(tables), Some(cell_sel)) = (&selectors.grid_tables, &selectors.grid_cells) else {
        return None;
    };
    let lookahead = doc.rules().config.grid.lookahead;

    for table in doc.html().select(tables) {
        if !labels.matches(&element_text(&table)) {
            continue;
        }
        let cells: Vec<String> = table.select(cell_sel).map(|c| element_text(&c)).collect();
        for (i, cell) in cells.iter().enumerate() {
            if !labels.matches(cell) {
                continue;
            }
            let end = (i + lookahead).min(cells.len().saturating_sub(1));
            if let Some(found) = cells[i + 1..=end.max(i)].iter().find_map(|c| accept(c)) {
                return Some(found);
            }
        }
    }
    None
}
