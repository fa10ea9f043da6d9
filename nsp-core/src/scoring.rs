//! Validating model answers and computing accuracy.
//!
//! Validation runs over every required column before anything is scored: a
//! single missing or invalid cell fails the whole report with the offending row
//! indices, so no partial accuracy is ever produced.

use crate::dataset::Table;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const LABEL_COLUMN: &str = "label";
pub const WRONG_MODEL_COLUMN: &str = "wrong_model";
pub const DISTANCE_COLUMN: &str = "distractor_distance";

const DEFAULT_MODELS: [&str; 3] = ["gpt", "gemini", "llama"];

/// The answer columns the three-model runs produce.
pub fn default_answer_columns(chain_of_thought: bool) -> Vec<String> {
    let suffix = if chain_of_thought { "_answer_COT" } else { "_answer" };
    DEFAULT_MODELS.iter().map(|m| format!("{m}{suffix}")).collect()
}

/// Data-integrity failures found while scoring.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Missing column: '{0}'")]
    MissingColumn(String),

    #[error("Column '{column}' has missing values at rows: {rows:?}")]
    MissingValues { column: String, rows: Vec<usize> },

    #[error("Column '{column}' has invalid values: {}", format_invalid(.values))]
    InvalidValues {
        column: String,
        values: Vec<(usize, String)>,
    },
}

fn format_invalid(values: &[(usize, String)]) -> String {
    values
        .iter()
        .map(|(row, value)| format!("'{value}' at row {row}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Accuracy of one answer column against the labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelScore {
    pub column: String,
    pub correct: usize,
    pub total: usize,
}

impl ModelScore {
    /// Percentage correct; zero for an empty dataset.
    pub fn accuracy_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for ModelScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2}% ({}/{})",
            self.column,
            self.accuracy_pct(),
            self.correct,
            self.total
        )
    }
}

/// Result of scoring a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub models: Vec<ModelScore>,
    /// Every wrongly answered row, once per model that got it wrong, with the
    /// model's column name in `wrong_model`.
    pub mismatches: Table,
}

impl ScoreReport {
    /// Wrong answers per scored model, counted by distractor distance.
    ///
    /// Every scored model gets an entry, in scoring order, even when it made
    /// no mistakes. `None` when the dataset has no `distractor_distance`
    /// column, which scoring does not require.
    pub fn distance_histogram(&self) -> Result<Option<Histogram>, ScoringError> {
        let models: Vec<String> = self.models.iter().map(|m| m.column.clone()).collect();
        histogram(&self.mismatches, models)
    }
}

/// Wrong-answer counts by distractor distance, per model.
pub type Histogram = Vec<(String, BTreeMap<usize, usize>)>;

/// Wrong answers per model in a mismatch table, counted by distractor
/// distance. Models appear in order of their first mismatch; `None` without a
/// `distractor_distance` column.
pub fn distractor_distance_histogram(mismatches: &Table) -> Result<Option<Histogram>, ScoringError> {
    histogram(mismatches, Vec::new())
}

fn histogram(mismatches: &Table, models: Vec<String>) -> Result<Option<Histogram>, ScoringError> {
    let Some(distance_col) = mismatches.column_index(DISTANCE_COLUMN) else {
        return Ok(None);
    };
    let model_col = column_index(mismatches, WRONG_MODEL_COLUMN)?;

    let mut histogram: Histogram = models.into_iter().map(|m| (m, BTreeMap::new())).collect();
    let mut invalid = Vec::new();

    for (row, cells) in mismatches.rows().iter().enumerate() {
        let Ok(distance) = cells[distance_col].trim().parse::<usize>() else {
            invalid.push((row, cells[distance_col].clone()));
            continue;
        };
        let model = &cells[model_col];
        let index = match histogram.iter().position(|(m, _)| m == model) {
            Some(index) => index,
            None => {
                histogram.push((model.clone(), BTreeMap::new()));
                histogram.len() - 1
            }
        };
        *histogram[index].1.entry(distance).or_insert(0) += 1;
    }

    if !invalid.is_empty() {
        return Err(ScoringError::InvalidValues {
            column: DISTANCE_COLUMN.to_string(),
            values: invalid,
        });
    }
    Ok(Some(histogram))
}

/// Validate `label` and every answer column, then score each column.
pub fn score(table: &Table, answer_columns: &[String]) -> Result<ScoreReport, ScoringError> {
    let mut normalized = table.clone();

    let required = std::iter::once(LABEL_COLUMN).chain(answer_columns.iter().map(String::as_str));
    for column in required {
        validate_column(&mut normalized, column)?;
    }
    tracing::info!(rows = table.len(), columns = answer_columns.len(), "all answers are valid");

    let label_col = column_index(&normalized, LABEL_COLUMN)?;
    let mut headers = normalized.headers().to_vec();
    headers.push(WRONG_MODEL_COLUMN.to_string());
    let mut mismatches = Table::new(headers);
    let mut models = Vec::with_capacity(answer_columns.len());

    for column in answer_columns {
        let answer_col = column_index(&normalized, column)?;
        let mut correct = 0;

        for cells in normalized.rows() {
            if cells[answer_col] == cells[label_col] {
                correct += 1;
            } else {
                let mut wrong = cells.clone();
                wrong.push(column.clone());
                mismatches.push_row(wrong);
            }
        }

        let model_score = ModelScore {
            column: column.clone(),
            correct,
            total: normalized.len(),
        };
        tracing::debug!(%model_score, "scored");
        models.push(model_score);
    }

    Ok(ScoreReport { models, mismatches })
}

fn column_index(table: &Table, column: &str) -> Result<usize, ScoringError> {
    table
        .column_index(column)
        .ok_or_else(|| ScoringError::MissingColumn(column.to_string()))
}

/// Check one column has no empty cells and only `A`/`B` after trimming and
/// upper-casing, and store the normalized values back.
fn validate_column(table: &mut Table, column: &str) -> Result<(), ScoringError> {
    let col = column_index(table, column)?;

    let missing: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, cells)| cells[col].trim().is_empty())
        .map(|(row, _)| row)
        .collect();
    if !missing.is_empty() {
        return Err(ScoringError::MissingValues {
            column: column.to_string(),
            rows: missing,
        });
    }

    table.map_column(col, |value| value.trim().to_uppercase());

    let invalid: Vec<(usize, String)> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, cells)| cells[col] != "A" && cells[col] != "B")
        .map(|(row, cells)| (row, cells[col].clone()))
        .collect();
    if !invalid.is_empty() {
        return Err(ScoringError::InvalidValues {
            column: column.to_string(),
            values: invalid,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 4]]) -> Table {
        let mut table = Table::new(["label", "distractor_distance", "gpt_answer", "llama_answer"]);
        for row in rows {
            table.push_row(row.iter().map(|s| s.to_string()).collect());
        }
        table
    }

    fn columns() -> Vec<String> {
        vec!["gpt_answer".to_string(), "llama_answer".to_string()]
    }

    #[test]
    fn test_perfect_answers() {
        let t = table(&[["A", "2", "A", "a"], ["B", "3", " b ", "B"]]);
        let report = score(&t, &columns()).unwrap();

        for model in &report.models {
            assert_eq!(model.correct, 2);
            assert_eq!(model.total, 2);
            assert_eq!(model.accuracy_pct(), 100.0);
        }
        assert!(report.mismatches.is_empty());
        assert_eq!(report.mismatches.headers().last().map(String::as_str), Some("wrong_model"));
    }

    #[test]
    fn test_mismatches_tagged_by_model() {
        let t = table(&[["A", "2", "B", "A"], ["B", "4", "B", "A"], ["A", "2", "B", "A"]]);
        let report = score(&t, &columns()).unwrap();

        assert_eq!(report.models[0].correct, 1);
        assert_eq!(report.models[1].correct, 2);
        assert_eq!(report.models[0].to_string(), "gpt_answer: 33.33% (1/3)");
        assert_eq!(report.mismatches.len(), 3);
        assert_eq!(report.mismatches.get(0, "wrong_model"), Some("gpt_answer"));
        assert_eq!(report.mismatches.get(2, "wrong_model"), Some("llama_answer"));

        let histogram = report.distance_histogram().unwrap().unwrap();
        assert_eq!(histogram[0].0, "gpt_answer");
        assert_eq!(histogram[0].1.get(&2), Some(&2));
        assert_eq!(histogram[1].1.get(&4), Some(&1));
    }

    #[test]
    fn test_histogram_from_mismatch_file() {
        let mut mismatches = Table::new(["distractor_distance", "wrong_model"]);
        for (distance, model) in [("3", "llama_answer"), ("2", "gpt_answer"), ("3", "llama_answer")] {
            mismatches.push_row(vec![distance.to_string(), model.to_string()]);
        }
        let histogram = distractor_distance_histogram(&mismatches).unwrap().unwrap();
        assert_eq!(histogram.len(), 2);
        assert_eq!(histogram[0].0, "llama_answer");
        assert_eq!(histogram[0].1.get(&3), Some(&2));

        mismatches.push_row(vec!["far".to_string(), "gpt_answer".to_string()]);
        assert!(matches!(
            distractor_distance_histogram(&mismatches),
            Err(ScoringError::InvalidValues { .. })
        ));
    }

    #[test]
    fn test_label_and_answer_only_table() {
        let mut t = Table::new(["label", "gpt_answer"]);
        t.push_row(vec!["A".to_string(), "b".to_string()]);
        t.push_row(vec!["B".to_string(), "B".to_string()]);

        let report = score(&t, &["gpt_answer".to_string()]).unwrap();
        assert_eq!(report.models[0].correct, 1);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches.get(0, "gpt_answer"), Some("B"));
        assert_eq!(report.distance_histogram().unwrap(), None);
    }

    #[test]
    fn test_invalid_value_reports_row() {
        let t = table(&[["A", "2", "A", "A"], ["B", "2", "C", "B"]]);
        let err = score(&t, &columns()).unwrap_err();
        assert_eq!(
            err,
            ScoringError::InvalidValues {
                column: "gpt_answer".to_string(),
                values: vec![(1, "C".to_string())],
            }
        );
        assert_eq!(
            err.to_string(),
            "Column 'gpt_answer' has invalid values: 'C' at row 1"
        );
    }

    #[test]
    fn test_missing_values_report_all_rows() {
        let t = table(&[["A", "2", "", "A"], ["B", "2", "B", "B"], ["A", "2", "  ", "A"]]);
        let err = score(&t, &columns()).unwrap_err();
        assert_eq!(
            err,
            ScoringError::MissingValues {
                column: "gpt_answer".to_string(),
                rows: vec![0, 2],
            }
        );
    }

    #[test]
    fn test_label_checked_first() {
        let t = table(&[["X", "2", "C", "A"]]);
        let err = score(&t, &columns()).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidValues { ref column, .. } if column == "label"));
    }

    #[test]
    fn test_missing_answer_column() {
        let t = table(&[["A", "2", "A", "A"]]);
        let err = score(&t, &["gemini_answer".to_string()]).unwrap_err();
        assert_eq!(err, ScoringError::MissingColumn("gemini_answer".to_string()));
    }

    #[test]
    fn test_default_columns() {
        assert_eq!(
            default_answer_columns(false),
            vec!["gpt_answer", "gemini_answer", "llama_answer"]
        );
        assert_eq!(default_answer_columns(true)[1], "gemini_answer_COT");
    }

    #[test]
    fn test_empty_dataset_scores_zero() {
        let report = score(&table(&[]), &columns()).unwrap();
        assert_eq!(report.models[0].total, 0);
        assert_eq!(report.models[0].accuracy_pct(), 0.0);
    }
}
