//! Application configuration for filinglens.
//!
//! User config lives at `~/.filinglens/filinglens.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file: the file names the environment
//! variables, and [`resolve_credentials`] reads them once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FilingLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "filinglens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".filinglens";

// ---------------------------------------------------------------------------
// Config structs (matching filinglens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Disclosure registry (OpenDART) settings.
    #[serde(default)]
    pub dart: DartConfig,

    /// Summarizer (Gemini) settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Filing selection policy.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Section extraction anchors and windows.
    #[serde(default)]
    pub section: SectionConfig,

    /// Whole-run settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[dart]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DartConfig {
    /// Name of the env var holding the OpenDART API key.
    #[serde(default = "default_dart_key_env")]
    pub api_key_env: String,

    /// API root, without trailing slash.
    #[serde(default = "default_dart_base_url")]
    pub base_url: String,

    /// Disclosure category code (`A` = periodic reports).
    #[serde(default = "default_category_code")]
    pub category_code: String,

    /// Records requested per catalog page.
    #[serde(default = "default_page_count")]
    pub page_count: u32,

    /// Upper bound on catalog pages followed per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request timeout.
    #[serde(default = "default_dart_timeout")]
    pub timeout_secs: u64,
}

impl Default for DartConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_dart_key_env(),
            base_url: default_dart_base_url(),
            category_code: default_category_code(),
            page_count: default_page_count(),
            max_pages: default_max_pages(),
            timeout_secs: default_dart_timeout(),
        }
    }
}

fn default_dart_key_env() -> String {
    "DART_API_KEY".into()
}
fn default_dart_base_url() -> String {
    "https://opendart.fss.or.kr/api".into()
}
fn default_category_code() -> String {
    "A".into()
}
fn default_page_count() -> u32 {
    10
}
fn default_max_pages() -> u32 {
    1
}
fn default_dart_timeout() -> u64 {
    60
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the Gemini API key.
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    /// API root, without trailing slash.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model used for the trend analysis.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout. Long corpora take a while.
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            base_url: default_gemini_base_url(),
            model: default_model(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_gemini_timeout() -> u64 {
    120
}

/// Which interim filings survive selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterimPolicy {
    /// Every semi-annual and quarterly filing on or after the cutoff.
    AllInterims,
    /// Only the `interim_cap` most recent interim filings on or after the cutoff.
    RecentInterims,
}

impl std::str::FromStr for InterimPolicy {
    type Err = FilingLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all-interims" => Ok(Self::AllInterims),
            "recent-interims" => Ok(Self::RecentInterims),
            other => Err(FilingLensError::validation(format!(
                "unknown selection policy '{other}' (expected all-interims or recent-interims)"
            ))),
        }
    }
}

/// `[selection]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Interim retention rule.
    #[serde(default = "default_policy")]
    pub policy: InterimPolicy,

    /// How far back the catalog query reaches.
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,

    /// Interim filings older than this many months are dropped.
    #[serde(default = "default_cutoff_months")]
    pub cutoff_months: u32,

    /// Maximum interim filings kept under `recent-interims`.
    #[serde(default = "default_interim_cap")]
    pub interim_cap: usize,

    /// Title substrings marking an annual report.
    #[serde(default = "default_annual_keywords")]
    pub annual: Vec<String>,

    /// Title substrings marking a semi-annual report.
    #[serde(default = "default_semi_annual_keywords")]
    pub semi_annual: Vec<String>,

    /// Title substrings marking a quarterly report.
    #[serde(default = "default_quarterly_keywords")]
    pub quarterly: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            lookback_months: default_lookback_months(),
            cutoff_months: default_cutoff_months(),
            interim_cap: default_interim_cap(),
            annual: default_annual_keywords(),
            semi_annual: default_semi_annual_keywords(),
            quarterly: default_quarterly_keywords(),
        }
    }
}

fn default_policy() -> InterimPolicy {
    InterimPolicy::AllInterims
}
fn default_lookback_months() -> u32 {
    36
}
fn default_cutoff_months() -> u32 {
    12
}
fn default_interim_cap() -> usize {
    2
}
fn default_annual_keywords() -> Vec<String> {
    vec!["사업보고서".into()]
}
fn default_semi_annual_keywords() -> Vec<String> {
    vec!["반기보고서".into()]
}
fn default_quarterly_keywords() -> Vec<String> {
    vec!["분기보고서".into()]
}

/// `[section]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Heading that opens the business description.
    #[serde(default = "default_start_anchor")]
    pub start_anchor: String,

    /// Heading that follows the business description.
    #[serde(default = "default_end_anchor")]
    pub end_anchor: String,

    /// Characters kept after the start anchor when the end anchor is missing.
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,

    /// Characters kept from the top when no anchor is found.
    #[serde(default = "default_prefix_chars")]
    pub prefix_chars: usize,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            start_anchor: default_start_anchor(),
            end_anchor: default_end_anchor(),
            window_chars: default_window_chars(),
            prefix_chars: default_prefix_chars(),
        }
    }
}

fn default_start_anchor() -> String {
    "II. 사업의 내용".into()
}
fn default_end_anchor() -> String {
    "III. 재무에 관한 사항".into()
}
fn default_window_chars() -> usize {
    30_000
}
fn default_prefix_chars() -> usize {
    15_000
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whole-run deadline; the request is abandoned once it passes.
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline(),
        }
    }
}

fn default_deadline() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Credentials (resolved once, injected into clients)
// ---------------------------------------------------------------------------

/// API keys read from the environment variables named in the config.
#[derive(Clone)]
pub struct Credentials {
    pub dart_api_key: String,
    pub gemini_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("dart_api_key", &"<redacted>")
            .field("gemini_api_key", &"<redacted>")
            .finish()
    }
}

/// Read both API keys. Fails fast with a configuration error naming the
/// missing variable, before any network call is made.
pub fn resolve_credentials(config: &AppConfig) -> Result<Credentials> {
    Ok(Credentials {
        dart_api_key: read_key(&config.dart.api_key_env, "https://opendart.fss.or.kr")?,
        gemini_api_key: read_key(&config.gemini.api_key_env, "https://aistudio.google.com")?,
    })
}

/// Read only the registry key (for commands that never summarize).
pub fn resolve_dart_key(config: &AppConfig) -> Result<String> {
    read_key(&config.dart.api_key_env, "https://opendart.fss.or.kr")
}

/// Read only the summarizer key.
pub fn resolve_gemini_key(config: &AppConfig) -> Result<String> {
    read_key(&config.gemini.api_key_env, "https://aistudio.google.com")
}

fn read_key(var_name: &str, signup_url: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(FilingLensError::config(format!(
            "API key not found. Set the {var_name} environment variable.\n\
             Get a key at {signup_url}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.filinglens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FilingLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.filinglens/filinglens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FilingLensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        FilingLensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FilingLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FilingLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FilingLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
