//! The `mcqbias run` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use mcqbias_core::dataset::load_dataset;
use mcqbias_core::debias::{debias_examples, debias_questions};
use mcqbias_core::engine::{EvalEngine, EvalEngineConfig, ProgressReporter};
use mcqbias_core::report::{DatasetSummary, EvalReport};
use mcqbias_core::results::QuestionResult;
use mcqbias_core::statistics::Summary;
use mcqbias_core::traits::GenerationOptions;
use mcqbias_core::{Outcome, Segment};
use mcqbias_providers::config::{create_generator, load_config_from};

use super::{make_rng, parse_golden};

#[derive(Args)]
pub struct RunArgs {
    /// Dataset root containing dev/ and test/ (default: datasets_path from config)
    #[arg(long)]
    pub datasets: Option<PathBuf>,

    /// Model to evaluate, optionally prefixed by provider (e.g. "ollama/llama3.2:3b")
    #[arg(long)]
    pub model: Option<String>,

    /// Move every test answer under this letter
    #[arg(long, conflicts_with = "debias_questions")]
    pub golden_option: Option<String>,

    /// Keep one few-shot example per letter per category
    #[arg(long)]
    pub debias_examples: bool,

    /// Spread test answers evenly across letters
    #[arg(long)]
    pub debias_questions: bool,

    /// Evaluate a random sample of N test questions
    #[arg(long)]
    pub sample: Option<usize>,

    /// Few-shot examples per prompt (default: the whole category)
    #[arg(long)]
    pub shots: Option<usize>,

    /// Seed for sampling and debiasing
    #[arg(long)]
    pub seed: Option<u64>,

    /// Max concurrent generation requests
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Backend generation option, repeatable (e.g. num_predict=10)
    #[arg(long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Output directory for the JSON report
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_question_start(&self, _index: usize) {}

    fn on_question_complete(&self, result: &QuestionResult) {
        let predicted = result.predicted.map_or("-", |l| l.as_str());
        match (&result.outcome, &result.error) {
            (Outcome::Error, Some(error)) => {
                eprintln!("  ERROR: #{} [{}]: {error}", result.index, result.category)
            }
            (outcome, _) => eprintln!(
                "  #{} [{}] expected {} got {} -> {} ({}ms)",
                result.index, result.category, result.expected, predicted, outcome, result.latency_ms
            ),
        }
    }

    fn on_batch_complete(&self, summary: &Summary, elapsed: Duration) {
        eprintln!(
            "\nComplete: {} correct, {} incorrect, {} errors ({:.1}s)",
            summary.correct,
            summary.incorrect,
            summary.errors,
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let parallelism = args.parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let seed = args.seed.or(config.seed);
    let golden_option = parse_golden(args.golden_option.as_deref())?;
    let options = parse_options(&args.options)?;

    let model_arg = args.model.unwrap_or_else(|| config.default_model.clone());
    let (provider_name, model) = config.resolve_model(&model_arg);
    let generator = create_generator(provider_name, &config)?;

    // Load pools
    let root = args.datasets.unwrap_or_else(|| config.datasets_path.clone());
    let mut examples = load_dataset(&root, Segment::Dev, None)?;
    let mut questions = load_dataset(&root, Segment::Test, golden_option)?;

    let mut rng = make_rng(seed);
    if args.debias_examples {
        examples = debias_examples(&examples, 1, &mut rng)?;
    }
    if args.debias_questions {
        questions = debias_questions(&questions, &mut rng);
    }
    if let Some(n) = args.sample {
        questions = questions.sample(n, &mut rng)?;
    }

    let mut dataset = DatasetSummary::new(root.display().to_string(), &examples, &questions);
    dataset.golden_option = golden_option;
    dataset.debiased_examples = args.debias_examples;
    dataset.debiased_questions = args.debias_questions;
    dataset.seed = seed;

    let engine = EvalEngine::new(
        generator,
        EvalEngineConfig {
            parallelism,
            model: model.to_string(),
            options,
            shots: args.shots,
            seed,
            request_timeout: Some(Duration::from_secs(config.timeout_secs)),
        },
    );

    eprintln!(
        "mcqbias v{}: {} questions x {} ({}), {} examples",
        env!("CARGO_PKG_VERSION"),
        questions.len(),
        model,
        provider_name,
        examples.len()
    );
    eprintln!();

    let report = engine
        .run(&examples, &questions, dataset, &ConsoleReporter)
        .await?;

    print_summary(&report);

    let output = args.output.unwrap_or_else(|| config.output_dir.clone());
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}

/// Parse `key=value` pairs. Values are read as JSON when possible, so
/// `num_predict=10` is a number and `stop=["\n"]` a list; anything else is a
/// plain string.
fn parse_options(pairs: &[String]) -> Result<GenerationOptions> {
    let mut options = GenerationOptions::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid --option '{pair}', expected KEY=VALUE"))?;
        let key = key.trim();
        anyhow::ensure!(!key.is_empty(), "invalid --option '{pair}': empty key");
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        options.insert(key.to_string(), value);
    }
    Ok(options)
}

fn print_summary(report: &EvalReport) {
    use comfy_table::{Cell, Table};

    let s = &report.summary;

    let mut overall = Table::new();
    overall.set_header(vec![
        "Model",
        "Questions",
        "Accuracy",
        "Error Rate",
        "Req/s",
    ]);
    overall.add_row(vec![
        Cell::new(format!("{}/{}", report.provider, report.model)),
        Cell::new(s.total),
        Cell::new(format!("{:.1}%", s.accuracy * 100.0)),
        Cell::new(format!("{:.1}%", s.error_rate * 100.0)),
        Cell::new(format!("{:.2}", s.requests_per_second)),
    ]);

    let mut letters = Table::new();
    letters.set_header(vec!["Letter", "Expected", "Predicted", "Correct", "Recall"]);
    for (letter, stats) in &s.per_letter {
        letters.add_row(vec![
            Cell::new(letter),
            Cell::new(stats.expected),
            Cell::new(stats.predicted),
            Cell::new(stats.correct),
            Cell::new(format!("{:.1}%", stats.recall() * 100.0)),
        ]);
    }

    eprintln!("\n{overall}\n{letters}");
}
