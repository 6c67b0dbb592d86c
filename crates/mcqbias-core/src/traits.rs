//! Text-generation capability.
//!
//! The core pipeline depends only on [`Generator`]; concrete backends live in
//! the `mcqbias-providers` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend-specific generation options, passed through verbatim
/// (e.g. `{"num_predict": 10}` for Ollama, `{"max_tokens": 1}` for OpenAI).
pub type GenerationOptions = serde_json::Map<String, serde_json::Value>;

/// Trait for LLM backends that complete prompts.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Complete a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// Models known to this provider without a network round-trip.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to complete a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "llama3.2:3b").
    pub model: String,
    /// The full prompt text.
    pub prompt: String,
    /// Backend-specific options.
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: GenerationOptions::new(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Completion returned by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw completion text.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens (0 if unknown).
    pub max_context: u32,
}
