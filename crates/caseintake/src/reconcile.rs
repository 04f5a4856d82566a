//! Compares finished extraction results against canonical intake answers and
//! decides the single review flag (if any) a result should carry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ReconcileConfig;
use crate::model::{DocType, ExtractedField, FieldValue, OcrResult, OcrStatus, ReviewFlag, ReviewReason};

/// The slice of canonical case data reconciliation reads. Values are absent
/// when the intake answer is missing or not money-like.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debtor_gross_pay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse_gross_pay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_current_ytd: Option<f64>,
}

impl CanonicalSnapshot {
    /// Builds a snapshot from raw intake answers keyed by field id. Answers
    /// that do not parse as money are treated as absent.
    pub fn from_answers(answers: &BTreeMap<String, String>) -> Self {
        let money = |field_id: &str| answers.get(field_id).and_then(|raw| parse_money_text(raw));
        Self {
            debtor_gross_pay: money("debtor_gross_pay"),
            spouse_gross_pay: money("spouse_gross_pay"),
            income_current_ytd: money("income_current_ytd"),
        }
    }
}

/// Applies the reconciliation rules to one result at a time.
///
/// Rules run in a fixed order and the first that fires wins; a result never
/// carries more than one flag. Re-running with the same inputs yields the
/// same flag, so reconciliation can be repeated after every store write.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// The overall-confidence cutoff, shared with the pipeline's completion
    /// check so both layers flag the same results as low confidence.
    pub fn low_confidence_cutoff(&self) -> f32 {
        self.config.low_confidence_cutoff
    }

    /// Decides the review flag for `result`. Only `done` results are
    /// examined; anything still in flight (or already failed in pre-flight)
    /// keeps whatever the pipeline gave it.
    pub fn reconcile(&self, canonical: &CanonicalSnapshot, result: &OcrResult) -> Option<ReviewFlag> {
        if result.status != OcrStatus::Done {
            return None;
        }

        // A pre-existing blocking flag survives everything except a conflict,
        // which outranks it.
        let existing = result.review.as_ref().filter(|flag| flag.needs_review);

        let raw_text = result.raw_text.as_deref().unwrap_or("").trim();
        let has_fields = result
            .extracted
            .as_ref()
            .map_or(false, |extraction| !extraction.fields.is_empty());

        if raw_text.is_empty() && !has_fields && existing.is_none() {
            return Some(ReviewFlag::with_detail(
                true,
                ReviewReason::Unreadable,
                "No OCR text extracted.",
            ));
        }

        if result.effective_doc_type() == DocType::Unknown && existing.is_none() {
            return Some(ReviewFlag::with_detail(
                false,
                ReviewReason::UnknownType,
                "Document type could not be classified.",
            ));
        }

        let confidence = result.ocr_confidence.unwrap_or(0.0);
        if confidence > 0.0 && confidence < self.config.low_confidence_cutoff && existing.is_none() {
            return Some(ReviewFlag::with_detail(
                true,
                ReviewReason::LowConfidence,
                "OCR confidence is low.",
            ));
        }

        if let Some(flag) = self.money_conflict(
            result.extracted_field("grossPay"),
            canonical.debtor_gross_pay,
            self.config.gross_pay_tolerance,
            "debtor_gross_pay",
            "Paystub gross",
        ) {
            return Some(flag);
        }

        if let Some(flag) = self.money_conflict(
            result.extracted_field("ytdGross"),
            canonical.income_current_ytd,
            self.config.ytd_tolerance,
            "income_current_ytd",
            "Paystub YTD gross",
        ) {
            return Some(flag);
        }

        existing.cloned()
    }

    /// Flags when an extracted money field and its canonical counterpart
    /// disagree by more than `tolerance`, relative to the canonical value.
    /// Low-confidence extractions are never trusted enough to conflict.
    fn money_conflict(
        &self,
        field: Option<&ExtractedField>,
        canonical_value: Option<f64>,
        tolerance: f64,
        intake_field_id: &str,
        label: &str,
    ) -> Option<ReviewFlag> {
        let field = field?;
        let extracted = parse_money_like(&field.value)?;
        let intake = canonical_value?;
        if field.confidence < self.config.min_field_confidence {
            return None;
        }
        if ratio_diff(extracted, intake) <= tolerance {
            return None;
        }
        Some(ReviewFlag::conflict(
            intake_field_id,
            intake,
            extracted,
            format!("{label} ({extracted}) differs from intake ({intake})."),
        ))
    }
}

/// Relative difference of `a` from `b`, with the denominator floored at 1 so
/// near-zero canonical values cannot blow the ratio up.
fn ratio_diff(a: f64, b: f64) -> f64 {
    (a - b).abs() / f64::max(1.0, b.abs())
}

fn parse_money_like(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) => n.is_finite().then_some(*n),
        FieldValue::Text(text) => parse_money_text(text),
    }
}

/// Parses `"$1,234.56"`-style answer text into a number. Currency symbols,
/// commas, and whitespace are ignored; anything else fails the parse.
fn parse_money_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && *c != '$' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}
