//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use filinglens_core::pipeline::NOTHING_SELECTED_MESSAGE;
use filinglens_core::{
    GeminiSettings, GeminiSummarizer, Pipeline, PipelineOutcome, PipelineSettings,
    ProgressReporter, SelectionPolicy, SelectionWindow, select,
};
use filinglens_dart::{DartClient, DartSettings, parse_date};
use filinglens_normalize::{SectionAnchors, extract_section, normalize};
use filinglens_shared::{
    AnalysisResponse, AppConfig, FilingRecord, InterimPolicy, init_config, load_config,
    resolve_credentials, resolve_dart_key, resolve_gemini_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// filinglens: trend analysis of DART periodic disclosures.
#[derive(Parser)]
#[command(
    name = "filinglens",
    version,
    about = "Select, clean, and summarize a company's DART periodic filings.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline and print the analysis.
    Analyze {
        /// Stock code (e.g. 005930) or registered company name.
        token: String,

        /// Interim selection policy: all-interims or recent-interims.
        #[arg(long)]
        policy: Option<InterimPolicy>,

        /// Print the structured response as JSON.
        #[arg(long)]
        json: bool,

        /// Also write the output to this file.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show which filings would be analyzed, without downloading them.
    Filings {
        /// Stock code or registered company name.
        token: String,

        /// Interim selection policy: all-interims or recent-interims.
        #[arg(long)]
        policy: Option<InterimPolicy>,

        /// Reference date (YYYYMMDD); defaults to today.
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Fetch one filing and print its normalized text.
    Extract {
        /// Registry receipt number.
        receipt_id: String,

        /// Print the whole document instead of the business section.
        #[arg(long)]
        full: bool,
    },

    /// List Gemini models that support text generation.
    Models,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "filinglens=info",
        1 => "filinglens=debug",
        _ => "filinglens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze {
            token,
            policy,
            json,
            out,
        } => cmd_analyze(&token, policy, json, out.as_deref()).await,
        Command::Filings {
            token,
            policy,
            as_of,
        } => cmd_filings(&token, policy, as_of.as_deref()).await,
        Command::Extract { receipt_id, full } => cmd_extract(&receipt_id, full).await,
        Command::Models => cmd_models().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Load config and apply a `--policy` override.
fn load_with_policy(policy: Option<InterimPolicy>) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(policy) = policy {
        config.selection.policy = policy;
    }
    Ok(config)
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_analyze(
    token: &str,
    policy: Option<InterimPolicy>,
    json: bool,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_with_policy(policy)?;
    // Both keys are checked before any network call.
    let credentials = resolve_credentials(&config)?;

    let dart = DartClient::new(DartSettings::from_config(
        &config.dart,
        credentials.dart_api_key.as_str(),
    ))?;
    let gemini = GeminiSummarizer::new(GeminiSettings::from_config(
        &config.gemini,
        credentials.gemini_api_key.as_str(),
    ))?;

    info!(token, policy = ?config.selection.policy, model = gemini.model(), "starting analysis");

    let pipeline = Pipeline::new(
        dart.clone(),
        dart.clone(),
        dart,
        gemini,
        PipelineSettings::from_config(&config),
    )
    .with_progress(Arc::new(CliProgress::new()));

    let response = pipeline.analyze(token, today()).await;
    drop(pipeline);

    let rendered = if json {
        serde_json::to_string_pretty(&response)?
    } else {
        render_response(&response)
    };
    println!("{rendered}");

    if let Some(path) = out {
        std::fs::write(path, &rendered)
            .map_err(|e| eyre!("failed to write {}: {e}", path.display()))?;
        info!(path = %path.display(), "output written");
    }

    match response.error {
        Some(error) => Err(eyre!(error)),
        None => Ok(()),
    }
}

fn render_response(response: &AnalysisResponse) -> String {
    if let Some(error) = &response.error {
        return format!("Analysis failed: {error}");
    }
    if !response.success {
        return response.message.clone().unwrap_or_default();
    }

    format!(
        "# {} ({})\n## {}\n\n{}",
        response.company.as_deref().unwrap_or_default(),
        response.stock_code.as_deref().unwrap_or_default(),
        response.report_title.as_deref().unwrap_or_default(),
        response.analysis_result.as_deref().unwrap_or_default(),
    )
}

async fn cmd_filings(token: &str, policy: Option<InterimPolicy>, as_of: Option<&str>) -> Result<()> {
    let config = load_with_policy(policy)?;
    let dart = DartClient::new(DartSettings::from_config(
        &config.dart,
        resolve_dart_key(&config)?,
    ))?;

    let reference = match as_of {
        Some(value) => parse_date(value)?,
        None => today(),
    };

    let issuer = dart.issuer_catalog().await?.resolve(token)?;
    let window = SelectionWindow::compute(
        reference,
        config.selection.lookback_months,
        config.selection.cutoff_months,
    )?;
    let records = dart
        .list_all_filings(&issuer.issuer_id, window.start, window.end)
        .await?;

    let policy = SelectionPolicy::from_config(&config.selection);
    let selected = select(&records, &policy, reference);

    println!();
    println!("  Issuer:   {} ({})", issuer.display_name, issuer.trading_id);
    println!("  Corp:     {}", issuer.issuer_id);
    println!("  Window:   {} .. {} (interim cutoff {})", window.start, window.end, window.cutoff);
    println!("  Listed:   {}", records.len());
    println!("  Selected: {}", selected.len());
    println!();
    for record in &selected {
        print_filing(record, &policy);
    }
    if !records.is_empty() && selected.is_empty() {
        println!("  {NOTHING_SELECTED_MESSAGE}");
    }
    println!();

    Ok(())
}

fn print_filing(record: &FilingRecord, policy: &SelectionPolicy) {
    let class = policy.table.classify(&record.title);
    println!(
        "  {}  {}  {:<12} {}",
        record.receipt_date,
        record.receipt_id,
        class.label(),
        record.title
    );
}

async fn cmd_extract(receipt_id: &str, full: bool) -> Result<()> {
    let config = load_config()?;
    let dart = DartClient::new(DartSettings::from_config(
        &config.dart,
        resolve_dart_key(&config)?,
    ))?;

    let raw = dart.fetch_document(receipt_id).await?;
    let text = normalize(&raw);

    if full {
        println!("{text}");
        return Ok(());
    }

    let anchors = SectionAnchors::from(&config.section);
    let section = extract_section(&text, &anchors);
    info!(receipt_id, span = ?section.span, chars = section.text.chars().count(), "section extracted");
    println!("{}", section.text);
    Ok(())
}

async fn cmd_models() -> Result<()> {
    let config = load_config()?;
    let gemini = GeminiSummarizer::new(GeminiSettings::from_config(
        &config.gemini,
        resolve_gemini_key(&config)?,
    ))?;

    let models = gemini.list_models().await?;
    for model in &models {
        let marker = if model.id() == config.gemini.model { "*" } else { " " };
        println!("{marker} {:<32} {}", model.id(), model.display_name);
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn filing_done(&self, record: &FilingRecord, ok: bool, current: usize, total: usize) {
        let status = if ok { "ok" } else { "skipped" };
        self.spinner.set_message(format!(
            "Fetched [{current}/{total}] {} ({status})",
            record.title
        ));
    }

    fn done(&self, _outcome: &PipelineOutcome) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
