//! The `mcqbias validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mcqbias_core::dataset::{load_dataset, validate_dataset};
use mcqbias_core::Segment;

pub fn execute(datasets: PathBuf) -> Result<()> {
    let mut total_warnings = 0;

    for segment in [Segment::Dev, Segment::Test] {
        let set = load_dataset(&datasets, segment, None)?;
        println!(
            "Segment {segment}: {} questions in {} categories",
            set.len(),
            set.categories().len()
        );

        let distribution = set
            .answer_distribution()
            .iter()
            .map(|(letter, count)| format!("{letter}={count}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  answers: {distribution}");

        let warnings = validate_dataset(&set);
        for w in &warnings {
            let prefix = w
                .index
                .map(|i| format!("  [#{i}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("Dataset valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
