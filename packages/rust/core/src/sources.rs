//! Collaborator seams of the pipeline.
//!
//! The pipeline only sees these traits. [`DartClient`] implements the three
//! registry-backed ones; tests substitute in-memory fakes.

use std::future::Future;

use chrono::NaiveDate;
use filinglens_dart::DartClient;
use filinglens_shared::{FilingRecord, IssuerInfo, Result};

/// Resolves a user token to an issuer.
pub trait IssuerDirectory: Send + Sync {
    fn resolve(&self, token: &str) -> impl Future<Output = Result<IssuerInfo>> + Send;
}

/// Lists an issuer's filings received in a date range, in catalog order.
pub trait FilingCatalog: Send + Sync {
    fn list(
        &self,
        issuer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<FilingRecord>>> + Send;
}

/// Fetches the raw markup of one filing.
pub trait ArchiveSource: Send + Sync + 'static {
    fn fetch(&self, receipt_id: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Turns the assembled corpus into prose.
///
/// Never fails: implementations return a fixed fallback message instead.
pub trait Summarizer: Send + Sync {
    fn summarize(
        &self,
        corpus: &str,
        display_name: &str,
        trading_id: &str,
    ) -> impl Future<Output = String> + Send;
}

// ---------------------------------------------------------------------------
// Registry-backed implementations
// ---------------------------------------------------------------------------

impl IssuerDirectory for DartClient {
    async fn resolve(&self, token: &str) -> Result<IssuerInfo> {
        self.issuer_catalog().await?.resolve(token)
    }
}

impl FilingCatalog for DartClient {
    async fn list(
        &self,
        issuer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FilingRecord>> {
        self.list_all_filings(issuer_id, start, end).await
    }
}

impl ArchiveSource for DartClient {
    async fn fetch(&self, receipt_id: &str) -> Result<String> {
        self.fetch_document(receipt_id).await
    }
}
