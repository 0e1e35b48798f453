//! Cell value normalization.
//!
//! Coerces raw cells into canonical scalars. A cell that cannot be coerced
//! becomes absent; it never fails the row on its own.

use flowcast_core::{OptionType, Side};

/// Parse a numeric cell.
///
/// Thousands separators and `$`/`%` symbols are stripped. Empty cells,
/// `nan`, `none` and anything unparsable yield `None`.
pub fn to_float(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        return None;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();

    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Normalize a side cell. First matching rule wins: ask/offer, bid, mid/between.
pub fn normalize_side(raw: Option<&str>) -> Side {
    let Some(raw) = raw else {
        return Side::Unknown;
    };
    let s = raw.to_lowercase();
    if s.contains("ask") || s.contains("offer") {
        Side::Ask
    } else if s.contains("bid") {
        Side::Bid
    } else if s.contains("mid") || s.contains("between") {
        Side::Mid
    } else {
        Side::Unknown
    }
}

/// Normalize an option-type cell by exact match after trimming.
pub fn normalize_option_type(raw: &str) -> Option<OptionType> {
    match raw.trim().to_lowercase().as_str() {
        "c" | "call" | "calls" => Some(OptionType::Call),
        "p" | "put" | "puts" => Some(OptionType::Put),
        _ => None,
    }
}

/// Normalize a free-text cell; blank cells are absent.
pub fn normalize_text(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
