//! Paystub extraction: gross pay, net pay, YTD gross, employer name.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::money::{money_values, parse_money, window};
use crate::model::ExtractedField;

// Stubs either label gross pay directly or print "GROSS <current> <ytd>"
// column pairs. The pair form is preferred, last pair on the page wins.
static GROSS_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bgross\s*[: ]+\$?\s*([0-9,]+(?:\.[0-9]{2})?)\s+\$?\s*([0-9,]+(?:\.[0-9]{2})?)")
        .unwrap()
});
static GROSS_PAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)gross\s*pay\s*[:-]?\s*\$?\s*([0-9,]+(\.[0-9]{2})?)").unwrap());
static TOTAL_GROSS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)total\s*gross[^0-9$]{0,30}\$?\s*([0-9,]+(\.[0-9]{2})?)").unwrap());
static NET_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)net\s*pay").unwrap());
static YTD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ytd[^0-9$]{0,20}(gross|earnings)[^0-9$]{0,20}\$?\s*([0-9,]+(\.[0-9]{2})?)").unwrap()
});
static FED_TAXABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)fed\s*taxable\s*gross").unwrap());
static EMPLOYER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)employer\s*[:-]?\s*([A-Za-z0-9 &.,'-]{3,60})").unwrap());

/// Net pay candidates above this multiple of gross are treated as unrelated
/// totals that happened to sit near the label.
pub const NET_PAY_GROSS_CEILING: f64 = 1.2;

pub(crate) fn extract(t: &str) -> BTreeMap<String, ExtractedField> {
    let mut out = BTreeMap::new();

    if let Some(caps) = GROSS_PAIR_RE.captures_iter(t).last() {
        if let Some(current) = caps.get(1).and_then(|m| parse_money(m.as_str())) {
            out.insert("grossPay".to_string(), ExtractedField::number(current, 0.7));
        }
        if let Some(ytd) = caps.get(2).and_then(|m| parse_money(m.as_str())) {
            out.insert("ytdGross".to_string(), ExtractedField::number(ytd, 0.65));
        }
    } else if let Some(caps) = GROSS_PAY_RE.captures(t) {
        if let Some(num) = caps.get(1).and_then(|m| parse_money(m.as_str())) {
            out.insert("grossPay".to_string(), ExtractedField::number(num, 0.6));
        }
    } else if let Some(caps) = TOTAL_GROSS_RE.captures(t) {
        if let Some(num) = caps.get(1).and_then(|m| parse_money(m.as_str())) {
            out.insert("grossPay".to_string(), ExtractedField::number(num, 0.65));
        }
    }

    // Net pay usually sits in a block with several monetary values. Collect
    // everything near each label, drop candidates that cannot plausibly be a
    // net amount, and keep the largest survivor.
    let mut net_candidates: Vec<f64> = Vec::new();
    for label in NET_LABEL_RE.find_iter(t) {
        net_candidates.extend(money_values(window(t, label.end(), 220)));
    }
    if !net_candidates.is_empty() {
        let gross = out.get("grossPay").and_then(|f| f.value.as_f64());
        let filtered: Vec<f64> = match gross {
            Some(g) => net_candidates
                .iter()
                .copied()
                .filter(|n| *n > 0.0 && *n <= g * NET_PAY_GROSS_CEILING)
                .collect(),
            None => net_candidates.iter().copied().filter(|n| *n > 0.0).collect(),
        };
        let pool = if filtered.is_empty() { &net_candidates } else { &filtered };
        let best = pool.iter().copied().fold(0.0_f64, f64::max);
        if best > 0.0 {
            out.insert("netPay".to_string(), ExtractedField::number(best, 0.55));
        }
    }

    // Variants like "YTD Gross Earnings" / "YTD Earnings".
    if !out.contains_key("ytdGross") {
        if let Some(num) = YTD_RE
            .captures(t)
            .and_then(|caps| caps.get(2))
            .and_then(|m| parse_money(m.as_str()))
        {
            out.insert("ytdGross".to_string(), ExtractedField::number(num, 0.55));
        }
    }

    // "FED TAXABLE GROSS <current> <ytd>" blocks. Keep the largest YTD seen.
    if !out.contains_key("ytdGross") {
        let mut best_ytd: Option<f64> = None;
        for label in FED_TAXABLE_RE.find_iter(t) {
            let nums = money_values(window(t, label.end(), 260));
            if nums.len() < 2 {
                continue;
            }
            let (current, ytd) = (nums[0], nums[1]);
            if ytd <= 0.0 || ytd < current {
                continue;
            }
            if best_ytd.map_or(true, |b| ytd > b) {
                best_ytd = Some(ytd);
            }
        }
        if let Some(ytd) = best_ytd {
            out.insert("ytdGross".to_string(), ExtractedField::number(ytd, 0.45));
        }
    }

    if let Some(m) = EMPLOYER_RE.captures(t).and_then(|caps| caps.get(1)) {
        let name = m.as_str().trim();
        if !name.is_empty() {
            out.insert("employerName".to_string(), ExtractedField::text(name, 0.45));
        }
    }

    out
}
