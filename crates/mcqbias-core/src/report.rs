//! Eval report types with JSON persistence.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Letter, QuestionSet};
use crate::results::QuestionResult;
use crate::statistics::Summary;

/// A complete eval report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Provider name (e.g. "ollama").
    pub provider: String,
    /// Model that was evaluated.
    pub model: String,
    /// Layout version of the prompts sent.
    pub prompt_version: u32,
    /// How the evaluated data was prepared.
    pub dataset: DatasetSummary,
    /// Individual question results, in completion order.
    pub results: Vec<QuestionResult>,
    /// Aggregate metrics.
    pub summary: Summary,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Description of the example and evaluation pools used for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Dataset name or root path.
    pub name: String,
    pub example_count: usize,
    pub question_count: usize,
    /// Letter every answer was moved under, if any.
    #[serde(default)]
    pub golden_option: Option<Letter>,
    #[serde(default)]
    pub debiased_examples: bool,
    #[serde(default)]
    pub debiased_questions: bool,
    /// Seed used for sampling and debiasing, if the run was seeded.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Ground-truth letter counts of the evaluated questions.
    pub answer_distribution: BTreeMap<Letter, usize>,
}

impl DatasetSummary {
    pub fn new(name: impl Into<String>, examples: &QuestionSet, questions: &QuestionSet) -> Self {
        Self {
            name: name.into(),
            example_count: examples.len(),
            question_count: questions.len(),
            answer_distribution: questions.answer_distribution(),
            ..Default::default()
        }
    }
}

impl EvalReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: EvalReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the summary as markdown.
    pub fn to_markdown(&self) -> String {
        let s = &self.summary;
        let mut md = format!(
            "**{} / {}:** accuracy {:.1}%, error rate {:.1}%, {} questions\n\n",
            self.provider,
            self.model,
            s.accuracy * 100.0,
            s.error_rate * 100.0,
            s.total
        );

        md.push_str("| Letter | Expected | Predicted | Recall |\n");
        md.push_str("|--------|----------|-----------|--------|\n");
        for (letter, stats) in &s.per_letter {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                letter,
                stats.expected,
                stats.predicted,
                stats.recall() * 100.0
            ));
        }

        md
    }
}
