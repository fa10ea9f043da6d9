//! Next-sentence-prediction benchmark CLI.
//!
//! ```bash
//! nsp generate --input stories.txt --output nsp_dataset.csv --seed 42
//! nsp sample --input nsp_dataset.csv --output nsp_sample.csv
//! nsp query --input nsp_sample.csv --output answers.csv --cot --language SW
//! nsp score --input answers.csv --cot
//! ```
//!
//! API keys are read from the environment or a `.env` file.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nsp=info,nsp_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate(args) => commands::generate(args).await,
        Commands::Sample(args) => commands::sample(args).await,
        Commands::Query(args) => commands::query(args).await,
        Commands::Score(args) => commands::score_answers(args).await,
    }
}
