//! Ownership attribution for documents in joint filings.
//!
//! A document can belong to the debtor, the spouse, or both. Detection
//! combines three signal families: filename cues, holder names extracted
//! from the document itself, and the upload slot the file was placed into.
//! Each signal carries its own confidence and a human-readable reasoning
//! line so the attribution stays explainable in review tooling.

use serde::{Deserialize, Serialize};

use crate::model::Ownership;

/// Aggregated confidence below this requires explicit client confirmation
/// before the guessed owner may be applied.
pub const CLARIFICATION_THRESHOLD: f32 = 0.8;

// Name matches at or below this are too weak to emit a signal.
const NAME_MATCH_FLOOR: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOwner {
    Debtor,
    Spouse,
    Joint,
}

impl SignalOwner {
    pub fn as_ownership(self) -> Ownership {
        match self {
            SignalOwner::Debtor => Ownership::Debtor,
            SignalOwner::Spouse => Ownership::Spouse,
            SignalOwner::Joint => Ownership::Joint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Filename,
    OcrName,
    OcrMultipleNames,
    UploadContext,
}

/// One weighted ownership clue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipSignal {
    pub owner: SignalOwner,
    pub confidence: f32,
    pub source: SignalSource,
    pub reasoning: String,
}

/// Debtor and spouse names from the canonical case record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseContext {
    pub debtor_full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse_full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debtor_first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse_first_name: Option<String>,
}

impl CaseContext {
    /// Builds a context from full names, deriving each first name from the
    /// leading word. A blank spouse name means there is no spouse.
    pub fn from_full_names(debtor_full_name: impl Into<String>, spouse_full_name: Option<String>) -> Self {
        let debtor_full_name = debtor_full_name.into();
        let spouse_full_name = spouse_full_name.filter(|n| !n.trim().is_empty());
        let debtor_first_name = debtor_full_name.split_whitespace().next().map(str::to_string);
        let spouse_first_name = spouse_full_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .map(str::to_string);
        Self {
            debtor_full_name,
            spouse_full_name,
            debtor_first_name,
            spouse_first_name,
        }
    }
}

/// Holder names pulled out of the document, when extraction found any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNames {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_holder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipDetection {
    pub ownership: Ownership,
    pub confidence: f32,
    pub signals: Vec<OwnershipSignal>,
    pub requires_client_clarification: bool,
}

/// Attributes a document to an owner from all available signals.
///
/// Pure function of its inputs. When aggregated confidence falls below
/// [`CLARIFICATION_THRESHOLD`] the result is flagged for client
/// clarification and callers must not apply the guess silently.
pub fn detect_ownership(
    filename: &str,
    names: &DocumentNames,
    context: &CaseContext,
    upload_hint: Option<&str>,
) -> OwnershipDetection {
    let mut signals = filename_signals(filename, context);
    signals.extend(document_name_signals(names, context));
    if let Some(signal) = upload_context_signal(upload_hint) {
        signals.push(signal);
    }

    let (ownership, confidence) = aggregate(&signals);
    OwnershipDetection {
        ownership,
        confidence,
        signals,
        requires_client_clarification: confidence < CLARIFICATION_THRESHOLD,
    }
}

fn filename_signals(filename: &str, context: &CaseContext) -> Vec<OwnershipSignal> {
    let mut signals = Vec::new();
    let lower = filename.to_lowercase();

    if lower.contains("joint") {
        signals.push(OwnershipSignal {
            owner: SignalOwner::Joint,
            confidence: 0.9,
            source: SignalSource::Filename,
            reasoning: "Filename contains \"joint\"".to_string(),
        });
    }

    let mut debtor_hit = false;
    if let Some(first) = context.debtor_first_name.as_deref().filter(|n| !n.is_empty()) {
        if lower.contains(&first.to_lowercase()) {
            debtor_hit = true;
            signals.push(OwnershipSignal {
                owner: SignalOwner::Debtor,
                confidence: 0.7,
                source: SignalSource::Filename,
                reasoning: format!("Filename contains debtor first name \"{first}\""),
            });
        }
    }

    let mut spouse_hit = false;
    if let Some(first) = context.spouse_first_name.as_deref().filter(|n| !n.is_empty()) {
        if lower.contains(&first.to_lowercase()) {
            spouse_hit = true;
            signals.push(OwnershipSignal {
                owner: SignalOwner::Spouse,
                confidence: 0.7,
                source: SignalSource::Filename,
                reasoning: format!("Filename contains spouse first name \"{first}\""),
            });
        }
    }

    if debtor_hit && spouse_hit {
        signals.push(OwnershipSignal {
            owner: SignalOwner::Joint,
            confidence: 0.85,
            source: SignalSource::Filename,
            reasoning: "Filename contains both debtor and spouse names".to_string(),
        });
    }

    signals
}

fn document_name_signals(names: &DocumentNames, context: &CaseContext) -> Vec<OwnershipSignal> {
    let mut signals = Vec::new();

    let name = names
        .account_holder_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or_else(|| names.employee_name.as_deref().filter(|n| !n.is_empty()));
    let Some(name) = name else {
        return signals;
    };

    // "John and Jane Doe" on an account is joint by itself; no further name
    // matching is useful once a conjunction is present.
    let name_lower = name.to_lowercase();
    if name_lower.contains(" and ") || name_lower.contains(" or ") || name_lower.contains(" & ") {
        signals.push(OwnershipSignal {
            owner: SignalOwner::Joint,
            confidence: 0.95,
            source: SignalSource::OcrMultipleNames,
            reasoning: "OCR extracted multiple names with \"and/or/&\"".to_string(),
        });
        return signals;
    }

    let debtor_match = match_name(name, &context.debtor_full_name);
    if debtor_match > NAME_MATCH_FLOOR {
        signals.push(OwnershipSignal {
            owner: SignalOwner::Debtor,
            confidence: debtor_match,
            source: SignalSource::OcrName,
            reasoning: format!("OCR name \"{name}\" matches debtor \"{}\"", context.debtor_full_name),
        });
    }

    if let Some(spouse_full) = context.spouse_full_name.as_deref().filter(|n| !n.is_empty()) {
        let spouse_match = match_name(name, spouse_full);
        if spouse_match > NAME_MATCH_FLOOR {
            signals.push(OwnershipSignal {
                owner: SignalOwner::Spouse,
                confidence: spouse_match,
                source: SignalSource::OcrName,
                reasoning: format!("OCR name \"{name}\" matches spouse \"{spouse_full}\""),
            });
        }
    }

    signals
}

fn upload_context_signal(upload_hint: Option<&str>) -> Option<OwnershipSignal> {
    let hint = upload_hint?;
    let lower = hint.to_lowercase();

    if lower.contains("debtor") && !lower.contains("spouse") {
        return Some(OwnershipSignal {
            owner: SignalOwner::Debtor,
            confidence: 0.6,
            source: SignalSource::UploadContext,
            reasoning: format!("Uploaded to debtor-specific field: {hint}"),
        });
    }

    if lower.contains("spouse") && !lower.contains("debtor") {
        return Some(OwnershipSignal {
            owner: SignalOwner::Spouse,
            confidence: 0.6,
            source: SignalSource::UploadContext,
            reasoning: format!("Uploaded to spouse-specific field: {hint}"),
        });
    }

    if lower.contains("joint") {
        return Some(OwnershipSignal {
            owner: SignalOwner::Joint,
            confidence: 0.8,
            source: SignalSource::UploadContext,
            reasoning: format!("Uploaded to joint field: {hint}"),
        });
    }

    None
}

/// Tiered fuzzy match between a document name and a case name, 0..1.
fn match_name(document_name: &str, full_name: &str) -> f32 {
    let doc = document_name.trim().to_lowercase();
    let full = full_name.trim().to_lowercase();
    if doc.is_empty() || full.is_empty() {
        return 0.0;
    }

    if doc == full {
        return 1.0;
    }
    if doc.contains(&full) {
        return 0.95;
    }

    let doc_parts: Vec<&str> = doc.split_whitespace().collect();
    let full_parts: Vec<&str> = full.split_whitespace().collect();
    let (Some(doc_last), Some(full_last)) = (doc_parts.last(), full_parts.last()) else {
        return 0.0;
    };

    // Matching surname is a strong signal on its own.
    if doc_last == full_last && full_last.len() > 2 {
        return 0.85;
    }

    if doc_parts.len() >= 2
        && full_parts.len() >= 2
        && doc_parts[0] == full_parts[0]
        && doc_last == full_last
    {
        return 0.9;
    }

    // First name alone is weak evidence.
    if doc_parts[0] == full_parts[0] && full_parts[0].len() > 2 {
        return 0.65;
    }

    0.0
}

fn aggregate(signals: &[OwnershipSignal]) -> (Ownership, f32) {
    if signals.is_empty() {
        return (Ownership::Unknown, 0.0);
    }

    // A conjunction between holder names is decisive on its own; summed
    // weaker cues must not outvote it.
    if let Some(conjunction) = signals.iter().find(|s| s.source == SignalSource::OcrMultipleNames) {
        return (Ownership::Joint, conjunction.confidence);
    }

    let mut debtor = 0.0_f32;
    let mut spouse = 0.0_f32;
    let mut joint = 0.0_f32;
    for signal in signals {
        match signal.owner {
            SignalOwner::Debtor => debtor += signal.confidence,
            SignalOwner::Spouse => spouse += signal.confidence,
            SignalOwner::Joint => joint += signal.confidence,
        }
    }

    let total = debtor + spouse + joint;
    let max = debtor.max(spouse).max(joint);
    if max <= 0.0 {
        return (Ownership::Unknown, 0.0);
    }

    let buckets = [
        (Ownership::Joint, joint),
        (Ownership::Debtor, debtor),
        (Ownership::Spouse, spouse),
    ];
    // Equal-weight buckets cannot be resolved automatically.
    if buckets.iter().filter(|(_, score)| *score == max).count() > 1 {
        return (Ownership::Unknown, 0.0);
    }
    let Some(&(owner, _)) = buckets.iter().find(|(_, score)| *score == max) else {
        return (Ownership::Unknown, 0.0);
    };

    // The denominator only normalizes once combined weight passes 1.0; a
    // lone signal keeps its own confidence.
    let confidence = if total > 1.0 { max / total } else { max };
    (owner, confidence)
}
