//! Next-sentence-prediction (NSP) benchmark engine.
//!
//! This crate provides:
//! - Story segmentation and sentence splitting
//! - Forced-choice item generation with seeded randomness
//! - Resumable, checkpointed model evaluation with retry
//! - Answer validation and accuracy scoring
//!
//! # Quick Start
//!
//! ```ignore
//! use nsp_core::{build_dataset, score, GeneratorConfig, Table};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let corpus = std::fs::read_to_string("stories.txt")?;
//! let mut rng = StdRng::seed_from_u64(42);
//! let (items, stats) = build_dataset(&corpus, &GeneratorConfig::default(), &mut rng)?;
//! println!("{} items from {} stories", stats.items, stats.stories);
//!
//! let table = Table::from_items(&items)?;
//! // ... run an `Evaluator` over `table`, then:
//! let report = score(&table, &nsp_core::scoring::default_answer_columns(false))?;
//! ```

pub mod answer;
pub mod dataset;
pub mod eval;
pub mod generator;
pub mod prompt;
pub mod query;
pub mod scoring;
pub mod testing;
pub mod text;

// Primary public API
pub use answer::{extract_answer_and_reasoning, Answer};
pub use dataset::{sample_rows, DatasetError, Table};
pub use eval::{EvalConfig, EvalError, EvalSummary, Evaluator};
pub use generator::{build_dataset, generate_items, BuildStats, ConfigError, GeneratorConfig, Label, NspItem};
pub use prompt::{PromptMode, ReasoningLanguage};
pub use query::{AnswerModel, ChatModel, QueryError, RetryPolicy};
pub use scoring::{distractor_distance_histogram, score, ModelScore, ScoreReport, ScoringError};
pub use testing::{MockModel, MockReply};
