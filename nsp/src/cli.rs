//! Command-line arguments.

use chat::Provider;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nsp_core::ReasoningLanguage;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nsp",
    version,
    about = "Build next-sentence-prediction benchmarks, query models on them, and score the answers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a dataset from a story corpus
    Generate(GenerateArgs),

    /// Draw a random subset of a dataset
    Sample(SampleArgs),

    /// Ask models to answer every item, resuming from earlier runs
    Query(QueryArgs),

    /// Validate answers and report accuracy per model
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Corpus text file, stories separated by lines of dashes
    #[arg(long)]
    pub input: PathBuf,

    /// Output CSV file
    #[arg(long, default_value = "nsp_dataset.csv")]
    pub output: PathBuf,

    /// Shortest context, in sentences
    #[arg(long, default_value_t = 3)]
    pub min_context: usize,

    /// Longest context, in sentences
    #[arg(long, default_value_t = 10)]
    pub max_context: usize,

    /// Smallest gap between the true next sentence and the distractor
    #[arg(long, default_value_t = 2)]
    pub min_distance: usize,

    /// Largest gap between the true next sentence and the distractor
    #[arg(long, default_value_t = 10)]
    pub max_distance: usize,

    /// RNG seed; omit for a fresh random run
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "nsp_sample.csv")]
    pub output: PathBuf,

    /// Number of rows to draw
    #[arg(short, long, default_value_t = 1000)]
    pub n: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Dataset CSV to answer
    #[arg(long)]
    pub input: PathBuf,

    /// Where answers are checkpointed. An existing file is resumed.
    #[arg(long)]
    pub output: PathBuf,

    /// Models to query, in order
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [ModelKind::Gpt, ModelKind::Gemini, ModelKind::Llama])]
    pub models: Vec<ModelKind>,

    /// Ask for step-by-step reasoning before the answer
    #[arg(long)]
    pub cot: bool,

    /// Reasoning language for --cot (EN, HA or SW)
    #[arg(long, default_value = "EN")]
    pub language: ReasoningLanguage,

    /// First row to process
    #[arg(long, default_value_t = 0)]
    pub start_index: usize,

    /// Save after this many rows
    #[arg(long, default_value_t = 5)]
    pub checkpoint_every: usize,

    /// Attempts per query, including the first
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,

    /// Seconds to wait after a transient failure
    #[arg(long, default_value_t = 60)]
    pub retry_delay: u64,

    /// Sampling temperature passed to every model
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f32,

    #[arg(long, env = "NSP_GPT_MODEL")]
    pub gpt_model: Option<String>,

    #[arg(long, env = "NSP_GEMINI_MODEL")]
    pub gemini_model: Option<String>,

    #[arg(long, env = "NSP_LLAMA_MODEL")]
    pub llama_model: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Answered dataset CSV
    #[arg(long)]
    pub input: PathBuf,

    /// Score the reasoning-run columns instead of the plain ones
    #[arg(long)]
    pub cot: bool,

    /// Answer columns to score, overriding the defaults
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Where wrongly answered rows are written
    #[arg(long, default_value = "wrong_answers.csv")]
    pub wrong_answers: PathBuf,
}

/// The three benchmarked model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Gpt,
    Gemini,
    Llama,
}

impl ModelKind {
    /// Column prefix for this model's answers.
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Gpt => "gpt",
            ModelKind::Gemini => "gemini",
            ModelKind::Llama => "llama",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ModelKind::Gpt => Provider::OpenAi,
            ModelKind::Gemini => Provider::Gemini,
            ModelKind::Llama => Provider::Together,
        }
    }
}

impl QueryArgs {
    /// Model id override for `kind`, if one was given.
    pub fn model_override(&self, kind: ModelKind) -> Option<&str> {
        match kind {
            ModelKind::Gpt => self.gpt_model.as_deref(),
            ModelKind::Gemini => self.gemini_model.as_deref(),
            ModelKind::Llama => self.llama_model.as_deref(),
        }
    }
}
