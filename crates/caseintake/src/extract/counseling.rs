//! Credit counseling certificate extraction: completion date.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::ExtractedField;

// "Date of completion: October 12, 2025" or "Completed on 10/12/2025".
static COMPLETION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:date\s*of\s*completion|completed\s*on|completion\s*date)\s*[:\s-]\s*([A-Za-z]+\s+\d{1,2},?\s*\d{4}|\d{1,2}/\d{1,2}/\d{4})",
    )
    .unwrap()
});
// Any slash date works as a fallback; classification already established the
// certificate context.
static ANY_DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").unwrap());

pub(crate) fn extract(t: &str) -> BTreeMap<String, ExtractedField> {
    let mut out = BTreeMap::new();

    let date = COMPLETION_RE
        .captures(t)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .or_else(|| ANY_DATE_RE.find(t).map(|m| m.as_str().to_string()));
    if let Some(date) = date {
        out.insert("completionDate".to_string(), ExtractedField::text(date, 0.6));
    }

    out
}
