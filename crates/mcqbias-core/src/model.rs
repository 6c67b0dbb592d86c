//! Core data model types for mcqbias.
//!
//! MCQ records, the ordered option alphabet, question collections, and the
//! tri-state grading outcome.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One selectable option letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

/// The option alphabet in enumeration order.
///
/// Debiasing assigns segment `i` to `OPTIONS[i]`, so this order is part of
/// the reproducibility contract.
pub const OPTIONS: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

impl Letter {
    pub fn as_str(self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
        }
    }

    /// Position of this letter within [`OPTIONS`].
    pub fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Letter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Letter::A),
            "B" => Ok(Letter::B),
            "C" => Ok(Letter::C),
            "D" => Ok(Letter::D),
            other => Err(CoreError::InvalidOption(other.to_string())),
        }
    }
}

/// Option texts, one per letter of [`OPTIONS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choices([String; 4]);

impl Choices {
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        c: impl Into<String>,
        d: impl Into<String>,
    ) -> Self {
        Self([a.into(), b.into(), c.into(), d.into()])
    }

    pub fn get(&self, letter: Letter) -> &str {
        &self.0[letter.position()]
    }

    /// Exchange the texts under two letters.
    pub fn swap(&mut self, a: Letter, b: Letter) {
        self.0.swap(a.position(), b.position());
    }

    /// Letter/text pairs in alphabet order.
    pub fn iter(&self) -> impl Iterator<Item = (Letter, &str)> {
        OPTIONS.iter().map(move |&letter| (letter, self.get(letter)))
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqRecord {
    /// Stable index within the loaded collection.
    pub index: usize,
    /// Question text.
    pub question: String,
    /// Option texts.
    pub choices: Choices,
    /// Letter holding the correct answer.
    pub answer: Letter,
    /// Topic grouping, e.g. "elementary mathematics".
    pub category: String,
}

impl McqRecord {
    /// Text of the correct option.
    pub fn answer_text(&self) -> &str {
        self.choices.get(self.answer)
    }
}

/// Grading result for one model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Correct => write!(f, "correct"),
            Outcome::Incorrect => write!(f, "incorrect"),
            Outcome::Error => write!(f, "error"),
        }
    }
}

/// Named dataset segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Few-shot example pool.
    Dev,
    /// Evaluation pool.
    Test,
    Val,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Dev => "dev",
            Segment::Test => "test",
            Segment::Val => "val",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Segment::Dev),
            "test" => Ok(Segment::Test),
            "val" | "validation" => Ok(Segment::Val),
            other => Err(format!("unknown segment: {other}")),
        }
    }
}

/// An ordered collection of MCQ records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    records: Vec<McqRecord>,
}

impl QuestionSet {
    pub fn new(records: Vec<McqRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[McqRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, McqRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<McqRecord> {
        self.records
    }

    /// Look up a record by its stable index.
    pub fn get(&self, index: usize) -> Option<&McqRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    /// Distinct categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Records of one category, in collection order.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a McqRecord> {
        self.records.iter().filter(move |r| r.category == category)
    }

    /// Count of records per answer letter. Every letter is present.
    pub fn answer_distribution(&self) -> BTreeMap<Letter, usize> {
        let mut counts: BTreeMap<Letter, usize> = OPTIONS.iter().map(|&l| (l, 0)).collect();
        for r in &self.records {
            *counts.entry(r.answer).or_default() += 1;
        }
        counts
    }

    /// Uniform random sample of `n` records, in random order.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<QuestionSet, CoreError> {
        if n > self.records.len() {
            return Err(CoreError::InsufficientExamples {
                category: "<all>".into(),
                required: n,
                available: self.records.len(),
            });
        }
        Ok(self.records.choose_multiple(rng, n).cloned().collect())
    }
}

impl FromIterator<McqRecord> for QuestionSet {
    fn from_iter<I: IntoIterator<Item = McqRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a McqRecord;
    type IntoIter = std::slice::Iter<'a, McqRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A record whose option texts name their original letter, e.g. "a3".
    pub fn record(index: usize, category: &str, answer: Letter) -> McqRecord {
        McqRecord {
            index,
            question: format!("Question {index}?"),
            choices: Choices::new(
                format!("a{index}"),
                format!("b{index}"),
                format!("c{index}"),
                format!("d{index}"),
            ),
            answer,
            category: category.to_string(),
        }
    }

    /// `n` records in one category with answers cycling through a skewed pattern.
    pub fn skewed_set(n: usize, category: &str) -> QuestionSet {
        (0..n)
            .map(|i| {
                let answer = if i % 3 == 0 { Letter::C } else { Letter::A };
                record(i, category, answer)
            })
            .collect()
    }
}
