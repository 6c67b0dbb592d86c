//! Option swapping.
//!
//! Moves the correct answer of a record under a chosen letter by exchanging
//! two option texts. Everything else about the record is left as it was.

use crate::error::CoreError;
use crate::model::{Letter, McqRecord, QuestionSet};

/// Return a copy of `record` whose correct answer sits under `target`.
///
/// The texts under `target` and under the current answer are exchanged and
/// `answer` is reassigned. Swapping back to the original answer letter
/// restores the record exactly.
pub fn swap_option(record: &McqRecord, target: Letter) -> McqRecord {
    let mut swapped = record.clone();
    swapped.choices.swap(target, record.answer);
    swapped.answer = target;
    swapped
}

/// Swap every record of `questions` so its answer sits under `option`.
///
/// Order and indices are preserved. Fails without producing a partial
/// collection when `option` is not part of the alphabet.
pub fn swap_options(questions: &QuestionSet, option: &str) -> Result<QuestionSet, CoreError> {
    let target: Letter = option.parse()?;
    Ok(swap_all(questions, target))
}

/// Typed form of [`swap_options`].
pub fn swap_all(questions: &QuestionSet, target: Letter) -> QuestionSet {
    questions.iter().map(|r| swap_option(r, target)).collect()
}
