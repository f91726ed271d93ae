//! Shared types, error model, and configuration for filinglens.
//!
//! This crate is the foundation depended on by all other filinglens crates.
//! It provides:
//! - [`FilingLensError`]: the unified error type
//! - Domain types ([`FilingRecord`], [`IssuerInfo`], [`NormalizedDocument`], [`AnalysisResponse`])
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, Credentials, DartConfig, GeminiConfig, InterimPolicy, PipelineConfig,
    SectionConfig, SelectionConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_credentials, resolve_dart_key, resolve_gemini_key,
};
pub use error::{FilingLensError, Result};
pub use types::{
    AnalysisResponse, FilingRecord, IssuerInfo, NormalizedDocument, UNLISTED_TRADING_ID,
};
