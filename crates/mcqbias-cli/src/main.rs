//! mcqbias CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "mcqbias",
    version,
    about = "Positional-bias evaluation for multiple-choice LLM benchmarks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a model on the test segment
    Run(commands::run::RunArgs),

    /// Print the prompt built for one test question
    Prompt {
        /// Dataset root containing dev/ and test/
        #[arg(long)]
        datasets: PathBuf,

        /// Stable index of the test question
        #[arg(long)]
        index: usize,

        /// Move every answer under this letter before building the prompt
        #[arg(long)]
        golden_option: Option<String>,

        /// Number of few-shot examples (default: the whole category)
        #[arg(long)]
        shots: Option<usize>,

        /// Seed for example sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write a debiased copy of a dataset segment
    Debias {
        /// Dataset root containing the segment directory
        #[arg(long)]
        datasets: PathBuf,

        /// Segment to debias: dev, test or val
        #[arg(long)]
        segment: String,

        /// Output dataset root
        #[arg(long)]
        output: PathBuf,

        /// Seed for sampling and shuffling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check dev and test segments for common issues
    Validate {
        /// Dataset root containing dev/ and test/
        #[arg(long)]
        datasets: PathBuf,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mcqbias=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Prompt {
            datasets,
            index,
            golden_option,
            shots,
            seed,
        } => commands::prompt::execute(datasets, index, golden_option, shots, seed),
        Commands::Debias {
            datasets,
            segment,
            output,
            seed,
        } => commands::debias::execute(datasets, segment, output, seed),
        Commands::Validate { datasets } => commands::validate::execute(datasets),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
