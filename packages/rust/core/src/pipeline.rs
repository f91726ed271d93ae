//! End-to-end analysis pipeline:
//! token → issuer → filings → selection → fetch/normalize/extract → corpus → summary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use filinglens_normalize::{SectionAnchors, extract_section, normalize};
use filinglens_shared::{
    AnalysisResponse, AppConfig, FilingLensError, FilingRecord, IssuerInfo, NormalizedDocument,
    Result,
};
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::corpus;
use crate::selection::{SelectionPolicy, SelectionWindow, select};
use crate::sources::{ArchiveSource, FilingCatalog, IssuerDirectory, Summarizer};

/// Reported when the catalog lists nothing in the window.
pub const NO_FILINGS_MESSAGE: &str = "no filings in range";
/// Reported when filings exist but the policy keeps none.
pub const NOTHING_SELECTED_MESSAGE: &str = "no filings matched the selection policy";

// ---------------------------------------------------------------------------
// Settings and results
// ---------------------------------------------------------------------------

/// Tunables for one [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub policy: SelectionPolicy,
    /// Length of the listing window, counted back from the reference date.
    pub lookback_months: u32,
    pub anchors: SectionAnchors,
    /// Whole-run deadline applied by [`Pipeline::analyze`].
    pub deadline: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            policy: SelectionPolicy::from_config(&config.selection),
            lookback_months: config.selection.lookback_months,
            anchors: SectionAnchors::from(&config.section),
            deadline: Duration::from_secs(config.pipeline.deadline_secs),
        }
    }

    /// Whole years covered by the listing window.
    pub fn lookback_years(&self) -> u32 {
        self.lookback_months.div_ceil(12)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// A selected filing that contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingFailure {
    pub receipt_id: String,
    pub title: String,
    pub error: String,
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub issuer: IssuerInfo,
    pub window: SelectionWindow,
    /// Selected filings, oldest first.
    pub selected: Vec<FilingRecord>,
    /// Documents that yielded text, in selection order.
    pub documents: Vec<NormalizedDocument>,
    pub failures: Vec<FilingFailure>,
    pub report_title: String,
    pub analysis: String,
    pub elapsed: Duration,
}

/// How a run ended, short of an error.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The catalog listed nothing in the window.
    NoFilings { issuer: IssuerInfo },
    /// Filings exist but the policy kept none of them.
    NothingSelected { issuer: IssuerInfo, listed: usize },
    Analyzed(Box<AnalysisReport>),
}

impl PipelineOutcome {
    pub fn issuer(&self) -> &IssuerInfo {
        match self {
            Self::NoFilings { issuer } | Self::NothingSelected { issuer, .. } => issuer,
            Self::Analyzed(report) => &report.issuer,
        }
    }

    pub fn into_response(self) -> AnalysisResponse {
        match self {
            Self::NoFilings { .. } => AnalysisResponse::empty(NO_FILINGS_MESSAGE),
            Self::NothingSelected { .. } => AnalysisResponse::empty(NOTHING_SELECTED_MESSAGE),
            Self::Analyzed(report) => {
                let report = *report;
                AnalysisResponse {
                    success: true,
                    company: Some(report.issuer.display_name),
                    stock_code: Some(report.issuer.trading_id),
                    report_title: Some(report.report_title),
                    analysis_result: Some(report.analysis),
                    ..Default::default()
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each selected filing finishes, in completion order.
    fn filing_done(&self, record: &FilingRecord, ok: bool, current: usize, total: usize);
    /// Called when the run completes without error.
    fn done(&self, outcome: &PipelineOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn filing_done(&self, _record: &FilingRecord, _ok: bool, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &PipelineOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<I, C, A, S> {
    issuers: I,
    catalog: C,
    archives: Arc<A>,
    summarizer: S,
    settings: PipelineSettings,
    progress: Arc<dyn ProgressReporter>,
}

impl<I, C, A, S> Pipeline<I, C, A, S>
where
    I: IssuerDirectory,
    C: FilingCatalog,
    A: ArchiveSource,
    S: Summarizer,
{
    pub fn new(issuers: I, catalog: C, archives: A, summarizer: S, settings: PipelineSettings) -> Self {
        Self {
            issuers,
            catalog,
            archives: Arc::new(archives),
            summarizer,
            settings,
            progress: Arc::new(SilentProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the pipeline for `token` with `today` as the reference date.
    ///
    /// Issuer resolution and catalog failures are fatal. A failure on one
    /// selected filing is logged and recorded; it only removes that filing
    /// from the corpus. The summarizer runs even when every filing failed.
    #[instrument(skip(self, today), fields(today = %today))]
    pub async fn run(&self, token: &str, today: NaiveDate) -> Result<PipelineOutcome> {
        let started = Instant::now();

        // --- Phase 1: Issuer ---
        self.progress.phase("Resolving issuer");
        let issuer = self.issuers.resolve(token).await?;
        info!(issuer_id = %issuer.issuer_id, name = %issuer.display_name, "issuer resolved");

        // --- Phase 2: Catalog ---
        self.progress.phase("Listing filings");
        let window = SelectionWindow::compute(
            today,
            self.settings.lookback_months,
            self.settings.policy.cutoff_months,
        )?;
        let records = self
            .catalog
            .list(&issuer.issuer_id, window.start, window.end)
            .await?;

        if records.is_empty() {
            info!("no filings in window");
            let outcome = PipelineOutcome::NoFilings { issuer };
            self.progress.done(&outcome);
            return Ok(outcome);
        }

        // --- Phase 3: Selection ---
        let selected = select(&records, &self.settings.policy, today);
        if selected.is_empty() {
            info!(listed = records.len(), "selection policy kept nothing");
            let outcome = PipelineOutcome::NothingSelected {
                issuer,
                listed: records.len(),
            };
            self.progress.done(&outcome);
            return Ok(outcome);
        }

        // --- Phase 4: Fetch, normalize, extract ---
        self.progress.phase("Fetching filings");
        let (documents, failures) = self.fetch_all(&selected).await;

        // --- Phase 5: Corpus ---
        let corpus = corpus::assemble(&documents);
        if corpus.is_empty() {
            warn!(selected = selected.len(), "no selected filing yielded text");
        }

        // --- Phase 6: Summary ---
        self.progress.phase("Summarizing");
        let analysis = self
            .summarizer
            .summarize(&corpus, &issuer.display_name, &issuer.trading_id)
            .await;

        let report = AnalysisReport {
            report_title: format!(
                "{}-year trend analysis ({} filings)",
                self.settings.lookback_years(),
                selected.len()
            ),
            issuer,
            window,
            selected,
            documents,
            failures,
            analysis,
            elapsed: started.elapsed(),
        };

        info!(
            documents = report.documents.len(),
            failures = report.failures.len(),
            corpus_chars = corpus.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pipeline complete"
        );

        let outcome = PipelineOutcome::Analyzed(Box::new(report));
        self.progress.done(&outcome);
        Ok(outcome)
    }

    /// [`run`](Self::run) under the configured deadline, mapped to a response.
    ///
    /// When the deadline passes the run is dropped, aborting any in-flight
    /// fetch tasks; no partial result is returned.
    pub async fn analyze(&self, token: &str, today: NaiveDate) -> AnalysisResponse {
        let deadline = self.settings.deadline;

        match tokio::time::timeout(deadline, self.run(token, today)).await {
            Ok(Ok(outcome)) => outcome.into_response(),
            Ok(Err(e)) => {
                warn!(error = %e, "analysis failed");
                AnalysisResponse::failure(e.to_string())
            }
            Err(_) => {
                let e = FilingLensError::Deadline {
                    secs: deadline.as_secs(),
                };
                warn!(error = %e, "analysis abandoned");
                AnalysisResponse::failure(e.to_string())
            }
        }
    }

    /// One task per filing; results are placed by index, not arrival order.
    async fn fetch_all(
        &self,
        selected: &[FilingRecord],
    ) -> (Vec<NormalizedDocument>, Vec<FilingFailure>) {
        let total = selected.len();
        let anchors = Arc::new(self.settings.anchors.clone());
        let mut tasks = JoinSet::new();

        for (index, record) in selected.iter().enumerate() {
            let archives = Arc::clone(&self.archives);
            let anchors = Arc::clone(&anchors);
            let record = record.clone();
            tasks.spawn(async move {
                let outcome = fetch_one(archives.as_ref(), &record, &anchors).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<NormalizedDocument>>> = (0..total).map(|_| None).collect();
        let mut completed = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    completed += 1;
                    self.progress
                        .filing_done(&selected[index], outcome.is_ok(), completed, total);
                    slots[index] = Some(outcome);
                }
                Err(e) => warn!(error = %e, "filing task did not complete"),
            }
        }

        let mut documents = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (record, slot) in selected.iter().zip(slots) {
            let error = match slot {
                Some(Ok(doc)) => {
                    documents.push(doc);
                    continue;
                }
                Some(Err(e)) => e.to_string(),
                None => "task did not complete".to_string(),
            };
            warn!(
                receipt_id = %record.receipt_id,
                title = %record.title,
                %error,
                "filing skipped"
            );
            failures.push(FilingFailure {
                receipt_id: record.receipt_id.clone(),
                title: record.title.clone(),
                error,
            });
        }

        (documents, failures)
    }
}

/// Fetch → normalize → extract for one filing.
async fn fetch_one<A: ArchiveSource>(
    archives: &A,
    record: &FilingRecord,
    anchors: &SectionAnchors,
) -> Result<NormalizedDocument> {
    let raw = archives.fetch(&record.receipt_id).await?;
    let text = normalize(&raw);
    let section = extract_section(&text, anchors);
    tracing::debug!(
        receipt_id = %record.receipt_id,
        span = ?section.span,
        chars = section.text.chars().count(),
        "section extracted"
    );
    Ok(NormalizedDocument::from_record(record, section.text.to_string()))
}
