// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Checks that reject obviously wrong matches: placeholders, footnote
//! numbers, page counters.

use std::sync::LazyLock;

use regex::Regex;

/// Ratios at or above this are assumed to be some other number on the page.
pub const MAX_PLAUSIBLE_RATIO: f64 = 1000.0;

const PLACEHOLDERS: &[&str] = &["—", "–", "-", "--", "n/a", "na", "none"];

static PLAIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d,.]+$").expect("plain number regex is valid"));

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("number token regex is valid"));

static CURRENCY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[₹$€£¥]\s?-?\d[\d,]*(?:\.\d+)?").expect("currency token regex is valid")
});

static EARNINGS_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-−]\s?)?(?:[₹$€£¥]\s?)?[-−]?\d[\d,]*(?:\.\d+)?(?:\s?(?:K|M|B|T|Cr|L))?$")
        .expect("earnings value regex is valid")
});

/// Dashes and "N/A" style fillers shown where a figure is missing.
pub fn is_placeholder(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    t.is_empty() || PLACEHOLDERS.contains(&t.as_str())
}

/// Parse a number written with thousands separators.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().replace(',', "").parse::<f64>().ok()
}

/// A cell that is exactly a positive number, e.g. `18.69` or `1,204.5`.
pub fn positive_ratio(text: &str) -> Option<String> {
    let t = text.trim();
    if is_placeholder(t) || !PLAIN_NUMBER.is_match(t) {
        return None;
    }
    parse_number(t).filter(|v| *v > 0.0).map(|_| t.to_string())
}

/// Like [`positive_ratio`] but also under [`MAX_PLAUSIBLE_RATIO`].
pub fn bounded_ratio(text: &str) -> Option<String> {
    positive_ratio(text).filter(|t| parse_number(t).is_some_and(|v| v < MAX_PLAUSIBLE_RATIO))
}

/// First number in a line of free text, if it is a plausible ratio.
pub fn ratio_in_line(line: &str) -> Option<String> {
    let token = NUMBER_TOKEN.find(line)?.as_str();
    bounded_ratio(token)
}

/// A cell that reads as an earnings figure: plain or currency-prefixed,
/// possibly negative, possibly with a magnitude suffix.
pub fn earnings_value(text: &str) -> Option<String> {
    let t = text.trim();
    if is_placeholder(t) || !EARNINGS_VALUE.is_match(t) {
        return None;
    }
    Some(t.to_string())
}

/// First currency-prefixed amount in the text, e.g. `₹22.13`.
pub fn currency_token(text: &str) -> Option<String> {
    CURRENCY_TOKEN.find(text).map(|m| m.as_str().to_string())
}
