//! Running answer models over a dataset.
//!
//! Rows are processed one at a time. A model is only asked about a row whose
//! answer cell does not already hold `A` or `B`, so an interrupted run resumes
//! where it stopped. The table is checkpointed to disk every few rows and
//! always before returning, including on failure.

use crate::answer::{extract_answer_and_reasoning, is_answered, normalize_plain, parse_label};
use crate::dataset::{DatasetError, Table};
use crate::prompt::PromptMode;
use crate::query::{AnswerModel, QueryError, RetryPolicy};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from an evaluation run.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("{model} failed on row {row}: {source}")]
    Query {
        row: usize,
        model: String,
        source: QueryError,
    },
}

/// Name of the answer column for `model`.
pub fn answer_column(model: &str, mode: PromptMode) -> String {
    if mode.is_chain_of_thought() {
        format!("{model}_answer_COT")
    } else {
        format!("{model}_answer")
    }
}

/// Name of the reasoning column for `model` (chain-of-thought runs only).
pub fn reasoning_column(model: &str) -> String {
    format!("{model}_reasoning_COT")
}

/// Settings for one evaluation run.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub mode: PromptMode,

    /// First row to consider.
    pub start_index: usize,

    /// Save after this many processed rows.
    pub checkpoint_every: usize,

    pub retry: RetryPolicy,

    /// Where checkpoints go. `None` keeps everything in memory.
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            mode: PromptMode::Plain,
            start_index: 0,
            checkpoint_every: 5,
            retry: RetryPolicy::default(),
            checkpoint_path: None,
        }
    }
}

impl EvalConfig {
    pub fn new(mode: PromptMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn with_checkpoint_every(mut self, rows: usize) -> Self {
        self.checkpoint_every = rows.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }
}

/// What a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalSummary {
    /// Rows at or after the start index.
    pub rows_visited: usize,
    /// Model queries that returned text.
    pub queries: usize,
    /// Replies without a usable `A`/`B`.
    pub unparsed: usize,
    pub checkpoints: usize,
}

/// Runs a set of models over a table.
pub struct Evaluator {
    models: Vec<Box<dyn AnswerModel>>,
    config: EvalConfig,
}

impl Evaluator {
    pub fn new(models: Vec<Box<dyn AnswerModel>>, config: EvalConfig) -> Self {
        Self { models, config }
    }

    /// Fill in missing answers in `table`.
    pub async fn run(&self, table: &mut Table) -> Result<EvalSummary, EvalError> {
        table.require_column("context")?;
        table.require_column("option_A")?;
        table.require_column("option_B")?;

        let mode = self.config.mode;
        for model in &self.models {
            table.ensure_column(&answer_column(model.name(), mode));
            if mode.is_chain_of_thought() {
                table.ensure_column(&reasoning_column(model.name()));
            }
        }

        let mut summary = EvalSummary::default();
        tracing::info!(
            rows = table.len(),
            start = self.config.start_index,
            models = self.models.len(),
            mode = ?mode,
            "starting evaluation"
        );

        for row in self.config.start_index..table.len() {
            summary.rows_visited += 1;

            if let Err(err) = self.process_row(table, row, &mut summary).await {
                tracing::error!(row, error = %err, "evaluation stopped, saving progress");
                self.checkpoint(table, &mut summary).await?;
                return Err(err);
            }

            if summary.rows_visited % self.config.checkpoint_every == 0 {
                self.checkpoint(table, &mut summary).await?;
                tracing::info!(row, "checkpoint saved");
            }
        }

        self.checkpoint(table, &mut summary).await?;
        tracing::info!(
            rows = summary.rows_visited,
            queries = summary.queries,
            unparsed = summary.unparsed,
            "evaluation finished"
        );
        Ok(summary)
    }

    async fn process_row(
        &self,
        table: &mut Table,
        row: usize,
        summary: &mut EvalSummary,
    ) -> Result<(), EvalError> {
        let mode = self.config.mode;
        let cell = |table: &Table, column: &str| table.get(row, column).unwrap_or_default().to_string();
        let prompt = mode.build(
            &cell(table, "context"),
            &cell(table, "option_A"),
            &cell(table, "option_B"),
        );

        for model in &self.models {
            let name = model.name();
            let answer_col = answer_column(name, mode);
            if is_answered(table.get(row, &answer_col)) {
                continue;
            }

            tracing::debug!(row, model = name, "querying");
            let response = self
                .config
                .retry
                .query(model.as_ref(), &prompt)
                .await
                .map_err(|source| EvalError::Query {
                    row,
                    model: name.to_string(),
                    source,
                })?;
            summary.queries += 1;

            let answer = if mode.is_chain_of_thought() {
                let (answer, reasoning) = extract_answer_and_reasoning(&response);
                table.set(row, &reasoning_column(name), reasoning)?;
                answer.to_string()
            } else {
                normalize_plain(&response)
            };

            if parse_label(&answer).is_none() {
                summary.unparsed += 1;
                tracing::warn!(row, model = name, answer = %answer, "reply has no usable answer");
            }
            tracing::debug!(row, model = name, answer = %answer, "answered");
            table.set(row, &answer_col, answer)?;
        }

        Ok(())
    }

    async fn checkpoint(&self, table: &Table, summary: &mut EvalSummary) -> Result<(), DatasetError> {
        if let Some(path) = &self.config.checkpoint_path {
            table.save(path).await?;
            summary.checkpoints += 1;
        }
        Ok(())
    }
}
