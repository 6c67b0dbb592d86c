//! The `mcqbias prompt` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use mcqbias_core::dataset::load_dataset;
use mcqbias_core::prompt::{generate_prompt, generate_prompt_with_shots};
use mcqbias_core::Segment;

use super::{make_rng, parse_golden};

pub fn execute(
    datasets: PathBuf,
    index: usize,
    golden_option: Option<String>,
    shots: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let golden_option = parse_golden(golden_option.as_deref())?;

    let examples = load_dataset(&datasets, Segment::Dev, None)?;
    let questions = load_dataset(&datasets, Segment::Test, golden_option)?;

    let mcq = questions.get(index).with_context(|| {
        format!(
            "no test question with index {index} ({} questions loaded)",
            questions.len()
        )
    })?;

    let prompt = match shots {
        Some(shots) => generate_prompt_with_shots(&examples, mcq, shots, &mut make_rng(seed))?,
        None => generate_prompt(&examples, mcq),
    };

    print!("{prompt}");
    Ok(())
}
