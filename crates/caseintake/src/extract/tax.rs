//! Tax return extraction: adjusted gross income and tax year.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::money::{money_values, parse_money, parse_year, window};
use crate::model::ExtractedField;

static AGI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)adjusted\s*gross\s*income[^0-9$]{0,20}\$?\s*([0-9,]+(\.[0-9]{2})?)").unwrap()
});
static YEAR_ENDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tax\s*year\s*ending[^0-9]{0,20}((19|20)\d{2})").unwrap());
static YEAR_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tax\s*year\s*[:-]?\s*([0-9]{4})").unwrap());
static ANY_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

pub(crate) fn extract(t: &str) -> BTreeMap<String, ExtractedField> {
    let mut out = BTreeMap::new();

    if let Some(num) = AGI_RE
        .captures(t)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_money(m.as_str()))
    {
        out.insert("agi".to_string(), ExtractedField::number(num, 0.6));
    } else {
        // IRS PDFs often come out as "This is your adjusted gross income
        // . ... 126,671". Look ahead from the label and keep the largest
        // money-like value of at least 1,000 in the window.
        let lower = t.to_lowercase();
        if let Some(idx) = lower.find("adjusted gross income") {
            let best = money_values(window(&lower, idx, 320))
                .into_iter()
                .filter(|n| *n >= 1000.0)
                .reduce(f64::max);
            if let Some(best) = best {
                out.insert("agi".to_string(), ExtractedField::number(best, 0.45));
            }
        }
    }

    let year_match = YEAR_ENDING_RE
        .find(t)
        .or_else(|| YEAR_LABEL_RE.find(t))
        .or_else(|| ANY_YEAR_RE.find(t));
    if let Some(year) = year_match.and_then(|m| parse_year(m.as_str())) {
        out.insert("taxYear".to_string(), ExtractedField::number(f64::from(year), 0.5));
    }

    out
}
