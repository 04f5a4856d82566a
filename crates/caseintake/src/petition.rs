//! Voluntary-petition text parsing.
//!
//! Pulls the filing answers a petition states in prose — chapter, fee
//! method, debt nature, estate ranges, execution date — out of OCR text
//! with ordered pattern tables, the same first-match-wins shape the
//! classifier uses. Everything here is best-effort: an answer no pattern
//! matches simply stays unset, and callers treat the result as prefill
//! suggestions rather than authoritative values.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::normalize;

/// Filing answers recognized in petition text. Field names double as the
/// intake field ids the values prefill.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetitionFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_fee_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_nature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liability_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
}

impl PetitionFields {
    /// True when no pattern matched anything.
    pub fn is_empty(&self) -> bool {
        self.filing_chapter.is_none()
            && self.filing_fee_method.is_none()
            && self.debt_nature.is_none()
            && self.asset_range.is_none()
            && self.liability_range.is_none()
            && self.filing_date.is_none()
    }
}

/// Chapter statements tried in order. Petitions list every chapter as a
/// checkbox label, so the consumer chapters sit first and the bare
/// "13 (Chapter)" form the checkbox OCR produces gets its own rows.
static CHAPTER_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("13", Regex::new(r"\bchapter\s*13\b").unwrap()),
        ("7", Regex::new(r"\bchapter\s*7\b").unwrap()),
        ("11", Regex::new(r"\bchapter\s*11\b").unwrap()),
        ("12", Regex::new(r"\bchapter\s*12\b").unwrap()),
        ("13", Regex::new(r"\b13\s+\(chapter\)").unwrap()),
        ("7", Regex::new(r"\b7\s+\(chapter\)").unwrap()),
    ]
});

static FEE_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "installments",
            Regex::new(r"pay\s+in\s+installments?|\binstallments?\b").unwrap(),
        ),
        (
            "waiver_request",
            Regex::new(r"\bwaiv(?:ed|er)\b|request\s+(?:a\s+)?waiver").unwrap(),
        ),
        (
            "full",
            Regex::new(r"pay\s+(?:the\s+)?entire|full\s+payment").unwrap(),
        ),
    ]
});

static DEBT_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("consumer", Regex::new(r"consumer\s+debts?\b").unwrap()),
        ("business", Regex::new(r"business\s+debts?\b").unwrap()),
        ("other", Regex::new(r"\bboth\b.*(consumer|business)").unwrap()),
        ("consumer", Regex::new(r"primarily\s+consumer").unwrap()),
    ]
});

/// Estate bands, each in the formatted shape the form prints and the bare
/// shape OCR leaves behind when it drops the currency marks. The commas are
/// optional and may carry stray spaces.
static RANGE_RULES: LazyLock<Vec<(&'static str, [Regex; 2])>> = LazyLock::new(|| {
    vec![
        (
            "500001-1000000",
            [
                Regex::new(r"\$?\s*500\s*,?\s*001\s*(?:[-–—]|to)\s*\$?\s*1\s*,?\s*000\s*,?\s*000")
                    .unwrap(),
                Regex::new(r"\b500001\s*[-–]\s*1000000\b").unwrap(),
            ],
        ),
        (
            "100001-500000",
            [
                Regex::new(r"\$?\s*100\s*,?\s*001\s*(?:[-–—]|to)\s*\$?\s*500\s*,?\s*000").unwrap(),
                Regex::new(r"\b100001\s*[-–]\s*500000\b").unwrap(),
            ],
        ),
        (
            "50001-100000",
            [
                Regex::new(r"\$?\s*50\s*,?\s*001\s*(?:[-–—]|to)\s*\$?\s*100\s*,?\s*000").unwrap(),
                Regex::new(r"\b50001\s*[-–]\s*100000\b").unwrap(),
            ],
        ),
        (
            "0-50000",
            [
                Regex::new(r"\$?\s*0\s*(?:[-–—]|to)\s*\$?\s*50\s*,?\s*000").unwrap(),
                Regex::new(r"\b0\s*[-–]\s*50000\b").unwrap(),
            ],
        ),
        (
            "1000001-10000000",
            [
                Regex::new(
                    r"\$?\s*1\s*,?\s*000\s*,?\s*001\s*(?:[-–—]|to)\s*\$?\s*10\s*,?\s*000\s*,?\s*000",
                )
                .unwrap(),
                Regex::new(r"\b1000001\s*[-–]\s*10000000\b").unwrap(),
            ],
        ),
    ]
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b|\b(\d{4})-(\d{2})-(\d{2})\b").unwrap()
});

/// A date sitting next to an execution or signature label.
static LABELED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:executed\s+on|signed\s+on|signature\s+date|dated)\s*:?\s*(\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2})",
    )
    .unwrap()
});

/// Parses the filing answers out of voluntary-petition text.
///
/// Matching runs case-insensitively over whitespace-normalized text. Each
/// answer takes the first matching pattern of its table; the filing date
/// takes the latest plausible date on the page, preferring dates next to an
/// execution or signature label. Unmatched answers stay `None`, so blank or
/// unrelated text yields an empty result.
pub fn parse_petition_text(text: &str) -> PetitionFields {
    let t = normalize(text).to_lowercase();
    if t.is_empty() {
        return PetitionFields::default();
    }
    // OCR flattens the asset and liability checkbox grids into one run of
    // text, so both answers take the first band found on the page.
    let range = find_range(&t);
    PetitionFields {
        filing_chapter: first_match(&CHAPTER_RULES, &t),
        filing_fee_method: first_match(&FEE_RULES, &t),
        debt_nature: first_match(&DEBT_RULES, &t),
        asset_range: range.clone(),
        liability_range: range,
        filing_date: find_date(&t).map(|date| date.to_string()),
    }
}

fn first_match(rules: &[(&'static str, Regex)], t: &str) -> Option<String> {
    rules
        .iter()
        .find(|(_, pattern)| pattern.is_match(t))
        .map(|(value, _)| (*value).to_string())
}

fn find_range(t: &str) -> Option<String> {
    RANGE_RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|pattern| pattern.is_match(t)))
        .map(|(value, _)| (*value).to_string())
}

fn find_date(t: &str) -> Option<NaiveDate> {
    let labeled = LABELED_DATE_RE
        .captures_iter(t)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_date(m.as_str()))
        .max();
    labeled.or_else(|| DATE_RE.find_iter(t).filter_map(|m| parse_date(m.as_str())).max())
}

/// Parses one `MM/DD/YYYY` or `YYYY-MM-DD` occurrence into a calendar date.
/// Impossible dates and years outside 1900 to 2100 are dropped.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(raw)?;
    let (year, month, day) = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(m), Some(d), Some(y)) => (y.as_str(), m.as_str(), d.as_str()),
        _ => (caps.get(4)?.as_str(), caps.get(5)?.as_str(), caps.get(6)?.as_str()),
    };
    let year: i32 = year.parse().ok()?;
    if !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_a_chapter_seven_petition() {
        let text = "
            Voluntary Petition for Individuals Filing for Bankruptcy
            The debtor is filing under Chapter 7 of title 11.
            I will pay the entire fee when I file my petition.
            Your debts are primarily consumer debts.
            Estimated assets: $0 - $50,000
            Executed on 11/26/2025
        ";
        let parsed = parse_petition_text(text);
        assert_eq!(parsed.filing_chapter.as_deref(), Some("7"));
        assert_eq!(parsed.filing_fee_method.as_deref(), Some("full"));
        assert_eq!(parsed.debt_nature.as_deref(), Some("consumer"));
        assert_eq!(parsed.asset_range.as_deref(), Some("0-50000"));
        assert_eq!(parsed.liability_range.as_deref(), Some("0-50000"));
        assert_eq!(parsed.filing_date.as_deref(), Some("2025-11-26"));
    }

    #[test]
    fn test_chapter_thirteen_with_installments() {
        let text = "
            Filing under chapter 13. I need to pay the fee in installments.
            Your debts are primarily business debts.
        ";
        let parsed = parse_petition_text(text);
        assert_eq!(parsed.filing_chapter.as_deref(), Some("13"));
        assert_eq!(parsed.filing_fee_method.as_deref(), Some("installments"));
        assert_eq!(parsed.debt_nature.as_deref(), Some("business"));
        assert!(parsed.filing_date.is_none());
    }

    #[test]
    fn test_checkbox_chapter_labels() {
        assert_eq!(parse_petition_text("13 (Chapter)").filing_chapter.as_deref(), Some("13"));
        // The full checkbox row lists every chapter; 13 outranks the rest.
        let row = parse_petition_text("Chapter 7 Chapter 11 Chapter 12 Chapter 13");
        assert_eq!(row.filing_chapter.as_deref(), Some("13"));
        assert_eq!(parse_petition_text("proceeding under Chapter 12").filing_chapter.as_deref(), Some("12"));
    }

    #[test]
    fn test_fee_waiver_phrasings() {
        let waived = parse_petition_text("I request that my filing fee be waived.");
        assert_eq!(waived.filing_fee_method.as_deref(), Some("waiver_request"));
        // Installments outrank a waiver mention further down the form.
        let both = parse_petition_text("pay the fee in installments unless the waiver is granted");
        assert_eq!(both.filing_fee_method.as_deref(), Some("installments"));
    }

    #[test]
    fn test_range_bands_in_formatted_and_bare_shapes() {
        let dash = parse_petition_text("Estimated liabilities: $500,001 – $1,000,000");
        assert_eq!(dash.asset_range.as_deref(), Some("500001-1000000"));
        assert_eq!(dash.liability_range.as_deref(), Some("500001-1000000"));

        let bare = parse_petition_text("liabilities 100001-500000");
        assert_eq!(bare.liability_range.as_deref(), Some("100001-500000"));

        let worded = parse_petition_text("assets of $1,000,001 to $10,000,000");
        assert_eq!(worded.asset_range.as_deref(), Some("1000001-10000000"));
    }

    #[test]
    fn test_filing_date_prefers_labeled_signature_dates() {
        let text = "
            Statement period 01/05/2024 through 02/04/2024.
            Hearing scheduled for 12/31/2026.
            Executed on 11/26/2025 /s/ Jordan Debtor
            Executed on 11/27/2025 /s/ Casey Debtor
        ";
        let parsed = parse_petition_text(text);
        assert_eq!(parsed.filing_date.as_deref(), Some("2025-11-27"));
    }

    #[test]
    fn test_filing_date_falls_back_to_latest_plausible_date() {
        let text = "period 01/15/2025 to 2025-03-02, OCR noise 99/99/2025 and 02/30/2025";
        let parsed = parse_petition_text(text);
        assert_eq!(parsed.filing_date.as_deref(), Some("2025-03-02"));

        let ancient = parse_petition_text("signed on 01/01/1776");
        assert!(ancient.filing_date.is_none());
    }

    #[test]
    fn test_unrelated_text_yields_empty_result() {
        assert!(parse_petition_text("").is_empty());
        assert!(parse_petition_text("weekly grocery receipt, milk and eggs").is_empty());
    }
}
