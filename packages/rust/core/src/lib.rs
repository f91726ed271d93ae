//! Core pipeline orchestration and domain logic for filinglens.
//!
//! This crate ties together issuer resolution, filing selection, document
//! retrieval, normalization, and summarization into one end-to-end run
//! (see [`pipeline::Pipeline`]).

pub mod corpus;
pub mod pipeline;
pub mod selection;
pub mod sources;
pub mod summarizer;

pub use pipeline::{
    AnalysisReport, FilingFailure, Pipeline, PipelineOutcome, PipelineSettings, ProgressReporter,
    SilentProgress,
};
pub use selection::{
    ClassificationTable, FilingClass, InterimRetention, SelectionPolicy, SelectionWindow, select,
};
pub use sources::{ArchiveSource, FilingCatalog, IssuerDirectory, Summarizer};
pub use summarizer::{FALLBACK_MESSAGE, GeminiSettings, GeminiSummarizer, ModelInfo};
