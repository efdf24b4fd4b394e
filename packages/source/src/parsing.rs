//! Shared cell parsing utilities.
//!
//! Spreadsheet exports are inconsistent about numbers: ids arrive as
//! `59150883`, `59150883.0`, or `5350003.00`, and measurements may carry
//! stray whitespace. These helpers coerce cells into canonical values and
//! return `None` rather than failing.

/// Parses a decimal measurement. Returns `None` if the value is not a
/// finite number.
#[must_use]
pub fn parse_decimal(s: &str) -> Option<f64> {
    let value = s.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Normalizes a numeric census geography id.
///
/// Trailing fractional zeros are removed so `"5350003.00"` and `"5350003"`
/// join to the same key, while `"9330045.01"` keeps its suffix. Non-numeric
/// ids are returned trimmed and unchanged.
#[must_use]
pub fn parse_geo_id(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let is_numeric = trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
        && trimmed.matches('.').count() <= 1
        && trimmed.chars().any(|c| c.is_ascii_digit());
    if !is_numeric || !trimmed.contains('.') {
        return Some(trimmed.to_string());
    }

    let normalized = trimmed.trim_end_matches('0').trim_end_matches('.');
    if normalized.is_empty() {
        return Some("0".to_string());
    }
    Some(normalized.to_string())
}

/// Parses a boolean flag cell (`1`/`0`, `true`/`false`, `yes`/`no`).
///
/// Numeric cells are compared against zero, so `"1.0"` is `true`.
#[must_use]
pub fn parse_flag(s: &str) -> Option<bool> {
    let lower = s.trim().to_lowercase();
    match lower.as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => parse_decimal(&lower).map(|v| v != 0.0),
    }
}
