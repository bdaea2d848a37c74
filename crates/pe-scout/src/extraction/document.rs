// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Rendered pages and their parsed form.

use scraper::{ElementRef, Html, Selector};

use super::selectors::{CompiledSelectors, Rules, RULES};

/// Elements whose text never reaches the screen.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line in rendered text.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "tbody", "thead", "tfoot", "tr", "ul",
];

/// Snapshot of a quote page as the browser rendered it.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// URL after redirects.
    pub url: String,
    pub title: String,
    pub html: String,
    /// The browser's `innerText` of the body, when available.
    pub body_text: Option<String>,
}

impl RenderedPage {
    /// Build a page from raw HTML, deriving the title from `<title>`.
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let parsed = Html::parse_document(&html);
        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| parsed.select(&sel).next().map(|el| element_text(&el)))
            .unwrap_or_default();
        Self {
            url: url.into(),
            title,
            html,
            body_text: None,
        }
    }

    /// Visible text, preferring what the browser reported.
    pub fn visible_text(&self) -> String {
        match &self.body_text {
            Some(text) => text.clone(),
            None => visible_text(&Html::parse_document(&self.html)),
        }
    }
}

/// A parsed page ready for the extraction heuristics.
///
/// Holds a `scraper::Html`, which is not `Send`; build and drop it on one
/// thread.
pub struct Document {
    html: Html,
    text: String,
    lines: Vec<String>,
    selectors: CompiledSelectors,
    rules: &'static Rules,
}

impl Document {
    pub fn parse(page: &RenderedPage) -> Self {
        let html = Html::parse_document(&page.html);
        let text = match &page.body_text {
            Some(text) => text.clone(),
            None => visible_text(&html),
        };
        let lines = text.lines().map(str::to_string).collect();
        let rules: &'static Rules = &RULES;
        Self {
            html,
            text,
            lines,
            selectors: CompiledSelectors::compile(&rules.config),
            rules,
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Full visible text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Visible text split into lines, untrimmed.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn selectors(&self) -> &CompiledSelectors {
        &self.selectors
    }

    pub fn rules(&self) -> &'static Rules {
        self.rules
    }
}

/// Whitespace-collapsed text content of an element.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Approximate `innerText`: block elements on their own lines, table cells
/// tab-separated, scripts and styles dropped.
pub fn visible_text(html: &Html) -> String {
    let mut out = String::new();
    let start = Selector::parse("body")
        .ok()
        .and_then(|sel| html.select(&sel).next())
        .unwrap_or_else(|| html.root_element());
    collect_text(start, &mut out);

    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if SKIPPED.contains(&name) {
        return;
    }
    let block = BLOCK.contains(&name);
    if block {
        out.push('\n');
    }

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }

    match name {
        "br" => out.push('\n'),
        "td" | "th" => out.push('\t'),
        _ if block => out.push('\n'),
        _ => {}
    }
}
