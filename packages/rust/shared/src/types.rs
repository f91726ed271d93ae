//! Core domain types for filinglens.

use serde::{Deserialize, Serialize};

/// Trading id reported for issuers without a listed stock code.
pub const UNLISTED_TRADING_ID: &str = "unlisted";

// ---------------------------------------------------------------------------
// IssuerInfo
// ---------------------------------------------------------------------------

/// A resolved reporting entity. Produced once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerInfo {
    /// Canonical registry identifier (8-digit DART corp code).
    pub issuer_id: String,
    /// Exchange trading identifier (6-digit stock code), or [`UNLISTED_TRADING_ID`].
    pub trading_id: String,
    /// Registered company name.
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// FilingRecord
// ---------------------------------------------------------------------------

/// Metadata for one disclosure filing, as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    /// Registry receipt number (14 digits).
    pub receipt_id: String,
    /// Report title, e.g. `사업보고서 (2023.12)`.
    pub title: String,
    /// Receipt date as `YYYYMMDD`; sorts lexicographically.
    pub receipt_date: String,
    /// Owning issuer's registry identifier.
    pub issuer_id: String,
    /// Owning issuer's trading identifier.
    pub trading_id: String,
}

// ---------------------------------------------------------------------------
// NormalizedDocument
// ---------------------------------------------------------------------------

/// Cleaned, section-extracted text of one filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub receipt_id: String,
    pub title: String,
    pub receipt_date: String,
    pub text: String,
}

impl NormalizedDocument {
    /// Build a document from the filing it was produced from.
    pub fn from_record(record: &FilingRecord, text: String) -> Self {
        Self {
            receipt_id: record.receipt_id.clone(),
            title: record.title.clone(),
            receipt_date: record.receipt_date.clone(),
            text,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisResponse
// ---------------------------------------------------------------------------

/// Structured result of one pipeline request, as consumed by front ends.
///
/// `message` carries non-error outcomes ("no filings in range"); `error`
/// carries failures. Absent fields are omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    /// A non-error "nothing to analyze" outcome.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// A failed request.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
