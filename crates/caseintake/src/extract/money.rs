//! Shared parsing helpers for the field extractors.
//!
//! Extractors run over normalized text: whitespace runs collapsed to single
//! spaces so labels and values sit on one line regardless of the PDF or OCR
//! layout they came from.

use std::sync::LazyLock;

use regex::Regex;

// Strict money shape. Grouped digits must come in commas-of-three, so OCR
// artifacts with a dropped decimal point ("29,067040") parse as 29,067
// instead of a six-figure value.
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\$?\s*([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})?|[0-9]+(?:\.[0-9]{2})?)").unwrap()
});

static MONEY_WINDOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\s*([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})?)").unwrap());

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(19|20)\d{2}").unwrap());

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapses whitespace runs (non-breaking spaces included) to single spaces
/// and trims the ends.
pub(crate) fn normalize(text: &str) -> String {
    SPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Parses the first money-shaped value in `raw`. Commas are thousands
/// separators; a leading sign or `$` is tolerated.
pub(crate) fn parse_money(raw: &str) -> Option<f64> {
    let caps = MONEY_RE.captures(raw)?;
    let cleaned = caps.get(1)?.as_str().replace(',', "");
    let num: f64 = cleaned.parse().ok()?;
    num.is_finite().then_some(num)
}

/// Parses the first plausible calendar year (1900 to 2100) in `raw`.
pub(crate) fn parse_year(raw: &str) -> Option<i32> {
    let found = YEAR_RE.find(raw)?;
    let year: i32 = found.as_str().parse().ok()?;
    (1900..=2100).contains(&year).then_some(year)
}

/// All money-shaped values in `text`, in order of appearance.
pub(crate) fn money_values(text: &str) -> Vec<f64> {
    MONEY_WINDOW_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter_map(parse_money)
        .collect()
}

/// Slice of `s` starting at the char boundary `start`, at most `len` bytes
/// long, clamped so a multi-byte character is never split.
pub(crate) fn window(s: &str, start: usize, len: usize) -> &str {
    let end = floor_char_boundary(s, start.saturating_add(len));
    &s[start..end]
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Gross\u{a0}Pay:\n\t $1,250.00  "), "Gross Pay: $1,250.00");
    }

    #[test]
    fn test_parse_money_accepts_currency_shapes() {
        assert_eq!(parse_money("$1,250.00"), Some(1250.0));
        assert_eq!(parse_money("4,321.98"), Some(4321.98));
        assert_eq!(parse_money("55,000"), Some(55000.0));
        assert_eq!(parse_money("945.32"), Some(945.32));
        assert_eq!(parse_money("no digits"), None);
    }

    #[test]
    fn test_parse_money_truncates_malformed_digit_runs() {
        assert_eq!(parse_money("29,067040"), Some(29067.0));
    }

    #[test]
    fn test_parse_year_bounds() {
        assert_eq!(parse_year("Tax Year: 2024"), Some(2024));
        assert_eq!(parse_year("in 1999"), Some(1999));
        assert_eq!(parse_year("year 1899"), None);
        assert_eq!(parse_year("no year"), None);
    }

    #[test]
    fn test_money_values_in_order() {
        assert_eq!(money_values("401.53 318.15 2,346.16"), vec![401.53, 318.15, 2346.16]);
        assert!(money_values("no amounts here").is_empty());
    }

    #[test]
    fn test_window_respects_char_boundaries() {
        let s = "ab\u{e9}cd";
        assert_eq!(window(s, 0, 3), "ab");
        assert_eq!(window(s, 0, 4), "ab\u{e9}");
        assert_eq!(window(s, 0, 99), s);
    }
}
