//! Subcommand handlers.

use crate::cli::{GenerateArgs, QueryArgs, SampleArgs, ScoreArgs};
use anyhow::{bail, Context, Result};
use chat::Client;
use nsp_core::scoring::default_answer_columns;
use nsp_core::{
    build_dataset, dataset::save_items, sample_rows, score, AnswerModel, ChatModel, EvalConfig,
    Evaluator, GeneratorConfig, PromptMode, RetryPolicy, Table,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

pub async fn generate(args: GenerateArgs) -> Result<()> {
    let corpus = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read corpus {}", args.input.display()))?;

    let config = GeneratorConfig::new()
        .with_context_range(args.min_context, args.max_context)
        .with_distractor_range(args.min_distance, args.max_distance);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (items, stats) = build_dataset(&corpus, &config, &mut rng)?;
    save_items(&items, &args.output)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Generated {} items from {} stories ({} too short) -> {}",
        stats.items,
        stats.stories,
        stats.skipped,
        args.output.display()
    );
    Ok(())
}

pub async fn sample(args: SampleArgs) -> Result<()> {
    let table = load(&args.input).await?;
    let sample = sample_rows(&table, args.n, args.seed);
    sample
        .save(&args.output)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Sampled {} of {} rows -> {}",
        sample.len(),
        table.len(),
        args.output.display()
    );
    Ok(())
}

pub async fn query(args: QueryArgs) -> Result<()> {
    let mode = if args.cot {
        PromptMode::ChainOfThought(args.language)
    } else {
        PromptMode::Plain
    };

    let mut models: Vec<Box<dyn AnswerModel>> = Vec::with_capacity(args.models.len());
    for kind in &args.models {
        let mut client = Client::from_env(kind.provider())
            .with_context(|| format!("Cannot query {}", kind.name()))?;
        if let Some(model) = args.model_override(*kind) {
            client = client.with_model(model);
        }
        tracing::info!(model = kind.name(), id = client.model(), "model ready");

        let model = ChatModel::new(kind.name(), client).with_temperature(args.temperature);
        models.push(Box::new(model));
    }

    // An existing output file holds earlier answers; pick up from there.
    let source = if tokio::fs::try_exists(&args.output).await.unwrap_or(false) {
        tracing::info!(path = %args.output.display(), "resuming from existing output");
        &args.output
    } else {
        &args.input
    };
    let mut table = load(source).await?;

    let retry = RetryPolicy::new()
        .with_max_attempts(args.max_attempts)
        .with_delay(Duration::from_secs(args.retry_delay));
    let config = EvalConfig::new(mode)
        .with_start_index(args.start_index)
        .with_checkpoint_every(args.checkpoint_every)
        .with_retry(retry)
        .with_checkpoint_path(&args.output);

    let summary = Evaluator::new(models, config)
        .run(&mut table)
        .await
        .with_context(|| format!("Progress saved to {}", args.output.display()))?;

    println!(
        "Processed {} rows with {} queries ({} unparsed answers) -> {}",
        summary.rows_visited,
        summary.queries,
        summary.unparsed,
        args.output.display()
    );
    Ok(())
}

pub async fn score_answers(args: ScoreArgs) -> Result<()> {
    let table = load(&args.input).await?;
    let columns = if args.columns.is_empty() {
        default_answer_columns(args.cot)
    } else {
        args.columns
    };

    let report = match score(&table, &columns) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "data integrity check failed");
            bail!("Scoring halted: {err}");
        }
    };

    println!("Accuracy over {} items:", table.len());
    for model in &report.models {
        println!("  {model}");
    }

    report
        .mismatches
        .save(&args.wrong_answers)
        .await
        .with_context(|| format!("Failed to write {}", args.wrong_answers.display()))?;
    println!(
        "{} wrong answers -> {}",
        report.mismatches.len(),
        args.wrong_answers.display()
    );

    match report.distance_histogram()? {
        Some(histogram) => {
            println!("Wrong answers by distractor distance:");
            for (model, counts) in histogram {
                let row: Vec<String> = counts.iter().map(|(d, n)| format!("{d}:{n}")).collect();
                println!("  {model}: {}", row.join(" "));
            }
        }
        None => tracing::debug!("no distractor_distance column, skipping distance breakdown"),
    }
    Ok(())
}

async fn load(path: &std::path::Path) -> Result<Table> {
    Table::load(path)
        .await
        .with_context(|| format!("Failed to read dataset {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_args(dir: &std::path::Path, columns: &[&str]) -> ScoreArgs {
        ScoreArgs {
            input: dir.join("answers.csv"),
            cot: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            wrong_answers: dir.join("wrong_answers.csv"),
        }
    }

    #[tokio::test]
    async fn test_score_label_and_answer_columns_only() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("answers.csv"), "label,gpt_answer\nA,B\nB,b\n")
            .await
            .unwrap();

        score_answers(score_args(dir.path(), &["gpt_answer"])).await.unwrap();

        let wrong = Table::load(dir.path().join("wrong_answers.csv")).await.unwrap();
        assert_eq!(wrong.len(), 1);
        assert_eq!(wrong.get(0, "wrong_model"), Some("gpt_answer"));
    }

    #[tokio::test]
    async fn test_score_invalid_answer_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("answers.csv"), "label,gpt_answer\nA,C\n")
            .await
            .unwrap();

        let err = score_answers(score_args(dir.path(), &["gpt_answer"])).await.unwrap_err();
        assert!(err.to_string().contains("row 0"));
        assert!(!dir.path().join("wrong_answers.csv").exists());
    }
}
