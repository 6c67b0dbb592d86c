//! OpenAI-compatible chat completions backend.
//!
//! The prompt is sent as a single user message. Generation options are
//! merged into the top level of the request body, so any field the API
//! accepts (`max_tokens`, `temperature`, `seed`, ...) can be passed through.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mcqbias_core::traits::{
    GenerateRequest, GenerateResponse, GenerationOptions, Generator, ModelInfo, TokenUsage,
};

use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible API backend.
pub struct OpenAiGenerator {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, base_url: Option<String>, org_id: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            org_id,
            client,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: [OpenAiMessage<'a>; 1],
    #[serde(flatten)]
    options: &'a GenerationOptions,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = OpenAiRequest {
            model: &request.model,
            messages: [OpenAiMessage {
                role: "user",
                content: &request.prompt,
            }],
            options: &request.options,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model.clone()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: OpenAiResponse = response.json().await.map_err(|e| {
            ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            }
        })?;

        // A null content (refusal, tool call) grades as malformed downstream.
        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(GenerateResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: api_response.usage.prompt_tokens,
                completion_tokens: api_response.usage.completion_tokens,
                total_tokens: api_response.usage.total_tokens,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        [
            ("gpt-4o-mini", "GPT-4o Mini", 128_000),
            ("gpt-4o", "GPT-4o", 128_000),
            ("gpt-4.1-mini", "GPT-4.1 Mini", 1_000_000),
        ]
        .into_iter()
        .map(|(id, name, max_context)| ModelInfo {
            id: id.into(),
            name: name.into(),
            provider: "openai".into(),
            max_context,
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: serde_json::Value) -> serde_json::Value {
        json!({
            "choices": [{"message": {"content": content, "role": "assistant"}, "index": 0}],
            "model": "gpt-4o-mini",
            "usage": {"prompt_tokens": 40, "completion_tokens": 5, "total_tokens": 45}
        })
    }

    #[tokio::test]
    async fn successful_generation_flattens_options() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_json(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "Question: 2+2?"}],
                "max_tokens": 10,
                "temperature": 0.0
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(json!("{\"answer\": \"D\"}"))),
            )
            .mount(&server)
            .await;

        let provider = OpenAiGenerator::new("test-key", Some(server.uri()), None).unwrap();
        let mut options = GenerationOptions::new();
        options.insert("max_tokens".into(), json!(10));
        options.insert("temperature".into(), json!(0.0));
        let request = GenerateRequest::new("gpt-4o-mini", "Question: 2+2?").with_options(options);

        let response = provider.generate(&request).await.unwrap();
        assert_eq!(response.content, "{\"answer\": \"D\"}");
        assert_eq!(response.token_usage.total_tokens, 45);
        assert_eq!(response.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn null_content_becomes_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(null))))
            .mount(&server)
            .await;

        let provider = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let response = provider
            .generate(&GenerateRequest::new("gpt-4o-mini", "test"))
            .await
            .unwrap();
        assert_eq!(response.content, "");
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let provider = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&GenerateRequest::new("gpt-4o-mini", "test"))
            .await
            .unwrap_err();
        let provider_err = err.downcast_ref::<ProviderError>().unwrap();
        assert_eq!(provider_err.retry_after_ms(), Some(2000));
        assert!(!provider_err.is_permanent());
    }

    #[tokio::test]
    async fn unauthorized_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let provider = OpenAiGenerator::new("bad", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&GenerateRequest::new("gpt-4o-mini", "test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert!(err.downcast_ref::<ProviderError>().unwrap().is_permanent());
    }

    #[tokio::test]
    async fn organization_header_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("OpenAI-Organization", "org-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!("A"))))
            .mount(&server)
            .await;

        let provider =
            OpenAiGenerator::new("key", Some(server.uri()), Some("org-123".into())).unwrap();
        let response = provider
            .generate(&GenerateRequest::new("gpt-4o-mini", "test"))
            .await
            .unwrap();
        assert_eq!(response.content, "A");
    }

    #[tokio::test]
    async fn error_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let provider = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&GenerateRequest::new("gpt-4o-mini", "test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
