//! Bank statement extraction: ending balance and statement period.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::money::parse_money;
use crate::model::ExtractedField;

// Statements repeat the balance per section; the last occurrence is the
// closing figure. An "on <date>" clause, when present, dates the balance.
static ENDING_BALANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)ending\s*balance(?:\s*on\s*([A-Za-z]+\s+\d{1,2},\s*(?:19|20)\d{2}))?\s*[:-]?\s*\$?\s*([0-9,]+(?:\.[0-9]{2})?)",
    )
    .unwrap()
});
static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)statement\s*period\s*[:-]?\s*([A-Za-z0-9/. -]{5,40})").unwrap());
static PERIOD_LOOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)period\s*[:-]?\s*([A-Za-z0-9/. -]{5,40})").unwrap());

pub(crate) fn extract(t: &str) -> BTreeMap<String, ExtractedField> {
    let mut out = BTreeMap::new();

    if let Some(caps) = ENDING_BALANCE_RE.captures_iter(t).last() {
        if let Some(num) = caps.get(2).and_then(|m| parse_money(m.as_str())) {
            out.insert("endingBalance".to_string(), ExtractedField::number(num, 0.6));
        }
        if let Some(date) = caps.get(1) {
            let date = date.as_str().trim();
            if !date.is_empty() {
                out.insert("endingBalanceDate".to_string(), ExtractedField::text(date, 0.45));
            }
        }
    }

    let period = PERIOD_RE
        .captures(t)
        .or_else(|| PERIOD_LOOSE_RE.captures(t))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()));
    if let Some(period) = period {
        if !period.is_empty() {
            out.insert("statementPeriod".to_string(), ExtractedField::text(period, 0.35));
        }
    }

    out
}
