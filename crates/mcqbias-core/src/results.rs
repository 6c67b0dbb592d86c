//! Per-question evaluation results.

use serde::{Deserialize, Serialize};

use crate::model::{Letter, Outcome};
use crate::traits::TokenUsage;

/// Outcome of running one question through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    /// Stable index of the graded question.
    pub index: usize,
    pub category: String,
    /// Ground-truth letter.
    pub expected: Letter,
    /// Letter extracted from the response, if it was well-formed.
    pub predicted: Option<Letter>,
    pub outcome: Outcome,
    /// Raw completion text; absent when generation failed.
    #[serde(default)]
    pub response: Option<String>,
    /// Generation failure message.
    #[serde(default)]
    pub error: Option<String>,
    pub latency_ms: u64,
    #[serde(default)]
    pub token_usage: TokenUsage,
}
