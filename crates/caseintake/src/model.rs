//! Core data model shared across the pipeline, store, and reconciler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Status & classification ────────────────────────────────────────────────

/// Lifecycle state of one ingestion result.
///
/// `NotProcessed` and `Unsupported` are reached directly from `Queued` when
/// pre-flight rejects the job; everything else goes through `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStatus {
    Queued,
    Processing,
    Done,
    Error,
    Unsupported,
    NotProcessed,
}

impl OcrStatus {
    /// Returns true for states that end a processing attempt.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OcrStatus::Queued | OcrStatus::Processing)
    }
}

impl std::fmt::Display for OcrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OcrStatus::Queued => "queued",
            OcrStatus::Processing => "processing",
            OcrStatus::Done => "done",
            OcrStatus::Error => "error",
            OcrStatus::Unsupported => "unsupported",
            OcrStatus::NotProcessed => "not_processed",
        };
        write!(f, "{}", s)
    }
}

/// Recognized document category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Paystub,
    BankStatement,
    TaxReturn,
    CreditCounseling,
    Unknown,
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocType::Paystub => "paystub",
            DocType::BankStatement => "bank_statement",
            DocType::TaxReturn => "tax_return",
            DocType::CreditCounseling => "credit_counseling",
            DocType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Which party of a (possibly joint) case a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Debtor,
    Spouse,
    Joint,
    Unknown,
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Ownership::Debtor => "debtor",
            Ownership::Spouse => "spouse",
            Ownership::Joint => "joint",
            Ownership::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

// ─── Extraction ─────────────────────────────────────────────────────────────

/// An extracted field value. Monetary and year fields are numbers;
/// everything else (dates, periods, names) stays text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => Some(s.as_str()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One extracted logical field with its pattern-specificity confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    pub value: FieldValue,
    /// Confidence in [0, 1]; labeled matches outrank windowed guesses.
    pub confidence: f32,
    /// Provenance marker, always `"ocr"` for pipeline-produced fields.
    pub source: String,
}

impl ExtractedField {
    pub fn number(value: f64, confidence: f32) -> Self {
        Self {
            value: FieldValue::Number(value),
            confidence,
            source: "ocr".to_string(),
        }
    }

    pub fn text(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: FieldValue::Text(value.into()),
            confidence,
            source: "ocr".to_string(),
        }
    }
}

/// Everything extracted from one document. Replaced wholesale whenever the
/// document is re-processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExtraction {
    pub doc_type: DocType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, ExtractedField>,
}

impl DocumentExtraction {
    pub fn empty(doc_type: DocType) -> Self {
        Self {
            doc_type,
            fields: BTreeMap::new(),
        }
    }
}

// ─── Review flags ───────────────────────────────────────────────────────────

/// Why a result was flagged for attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    LowConfidence,
    Conflict,
    Unreadable,
    Unsupported,
    TooLarge,
    MissingBlob,
    UnknownType,
    PartialPdf,
}

/// Advisory annotation attached to a result. Overwritten, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFlag {
    /// When false the flag is informational only.
    pub needs_review: bool,
    pub reason: ReviewReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Canonical intake field id a conflict was detected against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_field_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_intake_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_ocr_value: Option<f64>,
}

impl ReviewFlag {
    pub fn new(needs_review: bool, reason: ReviewReason) -> Self {
        Self {
            needs_review,
            reason,
            detail: None,
            conflict_field_id: None,
            conflict_intake_value: None,
            conflict_ocr_value: None,
        }
    }

    pub fn with_detail(needs_review: bool, reason: ReviewReason, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(needs_review, reason)
        }
    }

    /// A blocking conflict flag carrying both sides for side-by-side review.
    pub fn conflict(
        field_id: impl Into<String>,
        intake_value: f64,
        ocr_value: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            needs_review: true,
            reason: ReviewReason::Conflict,
            detail: Some(detail.into()),
            conflict_field_id: Some(field_id.into()),
            conflict_intake_value: Some(intake_value),
            conflict_ocr_value: Some(ocr_value),
        }
    }
}

// ─── The persisted result record ────────────────────────────────────────────

/// Page accounting for resumable multi-page PDF jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfPages {
    pub total_pages: u32,
    /// Monotonically non-decreasing across resumed runs; never exceeds
    /// `total_pages`.
    pub processed_pages: u32,
}

impl PdfPages {
    pub fn is_partial(&self) -> bool {
        self.processed_pages < self.total_pages
    }
}

/// The central persisted entity: one record per uploaded file id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignment_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_id: String,
    /// Upload-slot id the file was placed into; doubles as a classification
    /// hint and an ownership signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_field_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub status: OcrStatus,
    /// Fractional progress, only meaningful while `processing`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    /// Written only from a detector result or an explicit user override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub belongs_to: Option<Ownership>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfPages>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f32>,
    /// Recognized text, truncated to the store's cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<DocumentExtraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewFlag>,
    /// Idempotency key owned by a downstream notifier; opaque here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_issue_key: Option<String>,
}

impl OcrResult {
    /// A fresh record in the queued state.
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            assignment_id: String::new(),
            node_id: String::new(),
            legacy_field_id: None,
            name: String::new(),
            uploaded_at: Utc::now(),
            mime_type: None,
            size_bytes: None,
            status: OcrStatus::Queued,
            progress: None,
            processed_at: None,
            belongs_to: None,
            pdf: None,
            ocr_confidence: None,
            raw_text: None,
            doc_type: None,
            extracted: None,
            review: None,
            notified_issue_key: None,
        }
    }

    /// Effective classification, preferring the top-level type over the one
    /// embedded in the extraction.
    pub fn effective_doc_type(&self) -> DocType {
        self.doc_type
            .or_else(|| self.extracted.as_ref().map(|e| e.doc_type))
            .unwrap_or(DocType::Unknown)
    }

    pub fn extracted_field(&self, name: &str) -> Option<&ExtractedField> {
        self.extracted.as_ref().and_then(|e| e.fields.get(name))
    }
}
