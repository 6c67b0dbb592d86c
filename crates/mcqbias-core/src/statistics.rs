//! Aggregate statistics over a batch of graded questions.
//!
//! Besides overall accuracy, the per-letter breakdown compares how often
//! each letter is the ground truth with how often the model picks it, which
//! is the direct measure of positional bias.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Letter, Outcome, OPTIONS};
use crate::results::QuestionResult;

/// Batch-level metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub errors: usize,
    /// `correct / (total - errors)`; malformed responses are excluded.
    pub accuracy: f64,
    /// `errors / total`.
    pub error_rate: f64,
    pub requests_per_second: f64,
    pub per_letter: BTreeMap<Letter, LetterStats>,
    pub per_category: BTreeMap<String, CategoryStats>,
}

/// Counts for one option letter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterStats {
    /// Questions whose ground truth is this letter.
    pub expected: usize,
    /// Responses that picked this letter.
    pub predicted: usize,
    /// Questions with this ground truth answered correctly.
    pub correct: usize,
}

impl LetterStats {
    /// Share of this letter's questions answered correctly.
    pub fn recall(&self) -> f64 {
        ratio(self.correct, self.expected)
    }
}

/// Counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub correct: usize,
    pub errors: usize,
    pub accuracy: f64,
}

/// Summarize a batch. Result order does not matter.
pub fn summarize(results: &[QuestionResult], elapsed: Duration) -> Summary {
    let mut per_letter: BTreeMap<Letter, LetterStats> =
        OPTIONS.iter().map(|&l| (l, LetterStats::default())).collect();
    let mut per_category: BTreeMap<String, CategoryStats> = BTreeMap::new();
    let (mut correct, mut incorrect, mut errors) = (0, 0, 0);

    for r in results {
        let letter = per_letter.entry(r.expected).or_default();
        letter.expected += 1;

        let category = per_category.entry(r.category.clone()).or_default();
        category.total += 1;

        match r.outcome {
            Outcome::Correct => {
                correct += 1;
                letter.correct += 1;
                category.correct += 1;
            }
            Outcome::Incorrect => incorrect += 1,
            Outcome::Error => {
                errors += 1;
                category.errors += 1;
            }
        }

        if let Some(predicted) = r.predicted {
            per_letter.entry(predicted).or_default().predicted += 1;
        }
    }

    for stats in per_category.values_mut() {
        stats.accuracy = ratio(stats.correct, stats.total - stats.errors);
    }

    let total = results.len();
    let secs = elapsed.as_secs_f64();

    Summary {
        total,
        correct,
        incorrect,
        errors,
        accuracy: ratio(correct, total - errors),
        error_rate: ratio(errors, total),
        requests_per_second: if secs > 0.0 { total as f64 / secs } else { 0.0 },
        per_letter,
        per_category,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
