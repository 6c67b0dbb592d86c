//! Mock backend for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use mcqbias_core::traits::{GenerateRequest, GenerateResponse, Generator, ModelInfo, TokenUsage};

use crate::error::ProviderError;

/// A mock backend for exercising the pipeline without real API calls.
///
/// Returns the response of the first prompt substring that matches, or the
/// default response. Prompts containing a registered failure marker produce
/// a [`ProviderError::NetworkError`] instead.
pub struct MockGenerator {
    /// Ordered prompt substring → response pairs.
    responses: Vec<(String, String)>,
    /// Prompt substrings that make the call fail.
    failures: Vec<String>,
    /// Response when no prompt matches.
    default_response: String,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockGenerator {
    /// Create a mock with the given prompt→response mappings.
    pub fn new(responses: Vec<(String, String)>) -> Self {
        Self {
            responses,
            failures: Vec::new(),
            default_response: "{\"answer\": \"A\"}".to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(Vec::new())
        }
    }

    /// Fail every prompt that contains `marker`.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.failures.push(marker.to_string());
        self
    }

    /// Number of calls made to this backend.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last request received.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if let Some(marker) = self
            .failures
            .iter()
            .find(|m| request.prompt.contains(m.as_str()))
        {
            return Err(ProviderError::NetworkError(format!("scripted failure for '{marker}'")).into());
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        // Rough estimate, 4 chars per token.
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_response() {
        let provider = MockGenerator::with_fixed_response("{\"answer\": \"C\"}");
        let response = provider
            .generate(&GenerateRequest::new("mock", "anything"))
            .await
            .unwrap();
        assert_eq!(response.content, "{\"answer\": \"C\"}");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test]
    async fn prompt_matching_uses_first_match() {
        let provider = MockGenerator::new(vec![
            ("Question: one".into(), "{\"answer\": \"B\"}".into()),
            ("Question:".into(), "{\"answer\": \"D\"}".into()),
        ]);

        let resp = provider
            .generate(&GenerateRequest::new("mock", "Question: one?"))
            .await
            .unwrap();
        assert_eq!(resp.content, "{\"answer\": \"B\"}");

        let resp = provider
            .generate(&GenerateRequest::new("mock", "Question: two?"))
            .await
            .unwrap();
        assert_eq!(resp.content, "{\"answer\": \"D\"}");

        let resp = provider
            .generate(&GenerateRequest::new("mock", "unrelated"))
            .await
            .unwrap();
        assert_eq!(resp.content, "{\"answer\": \"A\"}");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn scripted_failure() {
        let provider = MockGenerator::with_fixed_response("A").failing_on("poison");
        let err = provider
            .generate(&GenerateRequest::new("mock", "a poison prompt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::NetworkError(_))
        ));
        assert_eq!(provider.call_count(), 1);
    }
}
