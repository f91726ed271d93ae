//! filinglens CLI: trend analysis of DART periodic disclosures.
//!
//! Resolves a company, selects its recent periodic filings, extracts the
//! business section of each, and asks a language model for an analyst
//! summary.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
