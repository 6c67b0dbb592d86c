//! Answer-distribution normalization.
//!
//! Redistributes correct-answer letters so every letter of [`OPTIONS`] holds
//! the answer equally often, either across a flat evaluation pool or per
//! category across a few-shot example pool. The random source is supplied by
//! the caller; seed it for reproducible output.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CoreError;
use crate::model::{McqRecord, QuestionSet, OPTIONS};
use crate::swap::swap_option;

/// Evenly distribute question answers across options.
///
/// Samples the largest multiple of `K = OPTIONS.len()` records, splits the
/// sample into `K` contiguous segments, moves the answers of segment `i` to
/// `OPTIONS[i]`, and shuffles the result. The `N mod K` remainder is
/// discarded. Record indices are kept from the source.
pub fn debias_questions<R: Rng + ?Sized>(questions: &QuestionSet, rng: &mut R) -> QuestionSet {
    let k = OPTIONS.len();
    let segment_size = questions.len() / k;
    let n = segment_size * k;

    let dropped = questions.len() - n;
    if dropped > 0 {
        tracing::debug!(dropped, kept = n, "dropping remainder questions while debiasing");
    }

    let sample: Vec<&McqRecord> = questions.records().choose_multiple(rng, n).collect();

    let mut normalized: Vec<McqRecord> = Vec::with_capacity(n);
    if segment_size > 0 {
        for (segment, &option) in sample.chunks(segment_size).zip(OPTIONS.iter()) {
            normalized.extend(segment.iter().map(|r| swap_option(r, option)));
        }
    }

    normalized.shuffle(rng);
    QuestionSet::new(normalized)
}

/// Evenly distribute example answers across options for each category.
///
/// Each category contributes `per_letter * K` randomly chosen examples, with
/// `per_letter` of them moved under each letter. Categories are visited in
/// first-appearance order and the combined output is shuffled.
pub fn debias_examples<R: Rng + ?Sized>(
    examples: &QuestionSet,
    per_letter: usize,
    rng: &mut R,
) -> Result<QuestionSet, CoreError> {
    let required = per_letter * OPTIONS.len();
    if required == 0 {
        return Ok(QuestionSet::default());
    }

    let mut normalized: Vec<McqRecord> = Vec::new();

    for category in examples.categories() {
        let pool: Vec<&McqRecord> = examples.in_category(category).collect();
        if pool.len() < required {
            return Err(CoreError::InsufficientExamples {
                category: category.to_string(),
                required,
                available: pool.len(),
            });
        }

        let selection: Vec<&McqRecord> = pool.choose_multiple(rng, required).copied().collect();
        for (segment, &option) in selection.chunks(per_letter).zip(OPTIONS.iter()) {
            normalized.extend(segment.iter().map(|r| swap_option(r, option)));
        }
    }

    normalized.shuffle(rng);
    Ok(QuestionSet::new(normalized))
}
