//! MMLU-style dataset loading.
//!
//! A dataset root holds one directory per segment (`dev/`, `test/`, `val/`),
//! each containing header-less CSV files with the columns
//! `question, A, B, C, D, answer`. The category of a file is its stem minus
//! the trailing segment word: `high_school_physics_test.csv` becomes
//! "high school physics".

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::{Choices, Letter, McqRecord, QuestionSet, Segment, OPTIONS};
use crate::swap::swap_all;

/// Text stored for cells that are empty in the source file.
pub const PLACEHOLDER: &str = "None";

/// Load every CSV file of `segment` under `root`.
///
/// Files are read in sorted path order and indices are assigned sequentially
/// across them, so reloading unchanged data yields an identical collection.
/// When `golden_option` is given, every answer is moved under that letter.
pub fn load_dataset(root: &Path, segment: Segment, golden_option: Option<Letter>) -> Result<QuestionSet> {
    let dir = root.join(segment.as_str());
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("failed to read dataset directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        anyhow::bail!("no CSV files found in {}", dir.display());
    }

    let mut records = Vec::new();
    for path in &paths {
        let category = infer_category(path);
        load_csv(path, &category, &mut records)?;
    }

    tracing::debug!(
        segment = %segment,
        files = paths.len(),
        questions = records.len(),
        "loaded dataset"
    );

    let questions = QuestionSet::new(records);
    Ok(match golden_option {
        Some(option) => swap_all(&questions, option),
        None => questions,
    })
}

/// Infer the category from a file name: `x_y_z_test.csv` -> `x y z`.
pub fn infer_category(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let words: Vec<&str> = stem.split('_').collect();
    words[..words.len().saturating_sub(1)].join(" ")
}

fn load_csv(path: &Path, category: &str, records: &mut Vec<McqRecord>) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to open CSV: {}", path.display()))?;

    for (row, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at row {row}", path.display()))?;
        if record.len() != 6 {
            anyhow::bail!(
                "{} row {row}: expected 6 columns, found {}",
                path.display(),
                record.len()
            );
        }

        let cell = |i: usize| -> String {
            match record.get(i) {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => PLACEHOLDER.to_string(),
            }
        };

        let answer: Letter = cell(5)
            .trim()
            .parse()
            .with_context(|| format!("{} row {row}: bad answer column", path.display()))?;

        records.push(McqRecord {
            index: records.len(),
            question: cell(0),
            choices: Choices::new(cell(1), cell(2), cell(3), cell(4)),
            answer,
            category: category.to_string(),
        });
    }

    Ok(())
}

/// Write `questions` under `root/segment` in the layout [`load_dataset`] reads.
///
/// One file per category, named `<category_with_underscores>_<segment>.csv`.
/// Returns the written paths in category order.
pub fn save_dataset(questions: &QuestionSet, root: &Path, segment: Segment) -> Result<Vec<PathBuf>> {
    let dir = root.join(segment.as_str());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let mut written = Vec::new();
    for category in questions.categories() {
        let file_name = format!("{}_{}.csv", category.replace(' ', "_"), segment);
        let path = dir.join(file_name);

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("failed to create CSV: {}", path.display()))?;

        for r in questions.in_category(category) {
            writer.write_record([
                r.question.as_str(),
                r.choices.get(Letter::A),
                r.choices.get(Letter::B),
                r.choices.get(Letter::C),
                r.choices.get(Letter::D),
                r.answer.as_str(),
            ])?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to write CSV: {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

/// A warning from dataset validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The record index (if applicable).
    pub index: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Validate a question collection for common issues.
pub fn validate_dataset(questions: &QuestionSet) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Empty question text
    for r in questions {
        if r.question.trim().is_empty() || r.question == PLACEHOLDER {
            warnings.push(ValidationWarning {
                index: Some(r.index),
                message: "question text is empty".into(),
            });
        }
    }

    // Duplicate questions within a category
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for r in questions {
        if !seen.insert((r.category.as_str(), r.question.as_str())) {
            warnings.push(ValidationWarning {
                index: Some(r.index),
                message: format!("duplicate question in '{}'", r.category),
            });
        }
    }

    // Identical option texts make a swapped answer indistinguishable
    for r in questions {
        for (i, &a) in OPTIONS.iter().enumerate() {
            for &b in &OPTIONS[i + 1..] {
                if r.choices.get(a) == r.choices.get(b) {
                    warnings.push(ValidationWarning {
                        index: Some(r.index),
                        message: format!("options {a} and {b} have identical text"),
                    });
                }
            }
        }
    }

    // Option cells that were empty in the source
    for r in questions {
        for (letter, text) in r.choices.iter() {
            if text == PLACEHOLDER {
                warnings.push(ValidationWarning {
                    index: Some(r.index),
                    message: format!("option {letter} holds the placeholder '{PLACEHOLDER}'"),
                });
            }
        }
    }

    // Categories too small for per-category debiasing
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in questions {
        *counts.entry(r.category.as_str()).or_default() += 1;
    }
    for category in questions.categories() {
        let count = counts.get(category).copied().unwrap_or(0);
        if count < OPTIONS.len() {
            warnings.push(ValidationWarning {
                index: None,
                message: format!(
                    "category '{category}' has {count} question(s); debiasing needs at least {}",
                    OPTIONS.len()
                ),
            });
        }
    }

    warnings
}
