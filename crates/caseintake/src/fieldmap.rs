//! Maps extractor field names onto canonical intake field ids, resolving
//! party-specific fields through document ownership.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{DocType, ExtractedField, FieldValue, Ownership};

/// Where one extracted field lands on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mapping {
    /// Same field id regardless of who the document belongs to.
    Shared(&'static str),
    /// Split by party; joint documents resolve to the debtor side.
    PerParty {
        debtor: &'static str,
        spouse: &'static str,
    },
}

fn mapping(doc_type: DocType, ocr_field: &str) -> Option<Mapping> {
    let m = match (doc_type, ocr_field) {
        // The intake form has no net-pay answer, so net maps onto gross.
        (DocType::Paystub, "grossPay") | (DocType::Paystub, "netPay") => Mapping::PerParty {
            debtor: "debtor_gross_pay",
            spouse: "spouse_gross_pay",
        },
        (DocType::Paystub, "ytdGross") => Mapping::Shared("income_current_ytd"),
        (DocType::Paystub, "employerName") => Mapping::PerParty {
            debtor: "debtor_employer",
            spouse: "spouse_employer",
        },
        (DocType::BankStatement, "endingBalance") => Mapping::Shared("account_balance"),
        (DocType::BankStatement, "statementPeriod") => Mapping::Shared("bank_statement_period"),
        (DocType::TaxReturn, "agi") => Mapping::Shared("income_last_year"),
        (DocType::TaxReturn, "expectedRefund") | (DocType::TaxReturn, "refundAmount") => {
            Mapping::Shared("tax_refunds_details")
        }
        (DocType::CreditCounseling, "completionDate") => Mapping::Shared("debtor_counseling_date"),
        _ => return None,
    };
    Some(m)
}

/// Resolves the intake field id for one extracted field, or `None` when the
/// field has no place on the form.
pub fn intake_field_id(doc_type: DocType, ocr_field: &str, belongs_to: Ownership) -> Option<&'static str> {
    match mapping(doc_type, ocr_field)? {
        Mapping::Shared(id) => Some(id),
        Mapping::PerParty { debtor, spouse } => Some(match belongs_to {
            Ownership::Spouse => spouse,
            _ => debtor,
        }),
    }
}

/// One extracted field resolved to its intake destination, ready to be
/// offered as a prefill suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedField {
    pub ocr_field: String,
    pub intake_field_id: &'static str,
    pub value: FieldValue,
    pub confidence: f32,
}

/// Resolves every mappable field in an extraction. Fields without a mapping
/// (for example `taxYear`) are silently skipped.
pub fn mappable_fields(
    doc_type: DocType,
    fields: &BTreeMap<String, ExtractedField>,
    belongs_to: Ownership,
) -> Vec<MappedField> {
    fields
        .iter()
        .filter_map(|(name, field)| {
            intake_field_id(doc_type, name, belongs_to).map(|intake_field_id| MappedField {
                ocr_field: name.clone(),
                intake_field_id,
                value: field.value.clone(),
                confidence: field.confidence,
            })
        })
        .collect()
}
