//! Document classification and typed field extraction.
//!
//! Classification is an ordered rule table: the first cue set matching the
//! normalized, lowercased text decides the [`DocType`], and a recognized
//! intake field hint (the upload slot the file arrived through) short-circuits
//! the text cues entirely. Extraction dispatches on the decided type and
//! returns `camelCase`-keyed fields, each with its own confidence.
//!
//! Both entry points are pure functions of their inputs so the same text
//! always yields the same fields, no matter which pipeline run produced it.

mod bank;
mod counseling;
mod money;
mod paystub;
mod tax;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DocType, ExtractedField};

pub use self::paystub::NET_PAY_GROSS_CEILING;
pub(crate) use self::money::normalize;

/// Cue sets tried in order against lowercased text; first match wins.
static CLASS_RULES: LazyLock<Vec<(DocType, Regex)>> = LazyLock::new(|| {
    vec![
        (
            DocType::Paystub,
            Regex::new(r"(pay\s*stub|earnings\s*statement|gross\s*pay|net\s*pay|ytd\s*(gross|earnings))")
                .unwrap(),
        ),
        (
            DocType::BankStatement,
            Regex::new(r"(statement\s*period|ending\s*balance|beginning\s*balance|account\s*summary)")
                .unwrap(),
        ),
        (
            DocType::TaxReturn,
            Regex::new(r"(form\s*1040|adjusted\s*gross\s*income|\bagi\b|tax\s*return)").unwrap(),
        ),
        (
            DocType::CreditCounseling,
            Regex::new(r"(credit\s*counseling|certificate\s*of\s*counseling|cc\s*certificate|pre-filing\s*certificate)")
                .unwrap(),
        ),
    ]
});

fn doc_type_for_hint(field_hint: &str) -> Option<DocType> {
    match field_hint {
        "upload_paystubs" => Some(DocType::Paystub),
        "upload_bank_statements" => Some(DocType::BankStatement),
        "upload_tax_returns" => Some(DocType::TaxReturn),
        "upload_debt_counseling" => Some(DocType::CreditCounseling),
        _ => None,
    }
}

/// Decides the document type for a page of text.
///
/// A recognized intake field hint wins outright, even over contradicting
/// text. Unhinted documents fall through the cue table and come back
/// [`DocType::Unknown`] when nothing matches.
pub fn classify_doc(text: &str, field_hint: Option<&str>) -> DocType {
    if let Some(doc_type) = field_hint.and_then(doc_type_for_hint) {
        return doc_type;
    }
    let t = normalize(text).to_lowercase();
    for (doc_type, cues) in CLASS_RULES.iter() {
        if cues.is_match(&t) {
            return *doc_type;
        }
    }
    DocType::Unknown
}

/// Extracts the typed fields for `doc_type` from raw page text.
///
/// Unknown documents and blank text yield an empty map.
pub fn extract_from_text(doc_type: DocType, text: &str) -> BTreeMap<String, ExtractedField> {
    let t = normalize(text);
    if t.is_empty() {
        return BTreeMap::new();
    }
    match doc_type {
        DocType::Paystub => paystub::extract(&t),
        DocType::BankStatement => bank::extract(&t),
        DocType::TaxReturn => tax::extract(&t),
        DocType::CreditCounseling => counseling::extract(&t),
        DocType::Unknown => BTreeMap::new(),
    }
}
