//! The `mcqbias debias` command.

use std::path::PathBuf;

use anyhow::Result;

use mcqbias_core::dataset::{load_dataset, save_dataset};
use mcqbias_core::debias::{debias_examples, debias_questions};
use mcqbias_core::Segment;

use super::make_rng;

pub fn execute(datasets: PathBuf, segment: String, output: PathBuf, seed: Option<u64>) -> Result<()> {
    let segment: Segment = segment.parse().map_err(anyhow::Error::msg)?;
    let source = load_dataset(&datasets, segment, None)?;
    let mut rng = make_rng(seed);

    // The few-shot bank is balanced per category, evaluation segments as a whole.
    let debiased = match segment {
        Segment::Dev => debias_examples(&source, 1, &mut rng)?,
        Segment::Test | Segment::Val => debias_questions(&source, &mut rng),
    };

    let written = save_dataset(&debiased, &output, segment)?;

    println!(
        "Debiased {segment}: {} of {} questions kept, {} file(s) written to {}",
        debiased.len(),
        source.len(),
        written.len(),
        output.join(segment.as_str()).display()
    );
    for (letter, count) in debiased.answer_distribution() {
        println!("  {letter}: {count}");
    }

    Ok(())
}
