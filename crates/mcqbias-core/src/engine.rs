//! Batch evaluation engine.
//!
//! Builds every prompt up front, then runs generate → grade for each question
//! through a bounded pool of concurrent requests. A failed or timed-out
//! generation only affects its own question.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::evaluate::grade;
use crate::model::{McqRecord, Outcome, QuestionSet};
use crate::prompt::{generate_prompt, generate_prompt_with_shots, PROMPT_VERSION};
use crate::report::{DatasetSummary, EvalReport};
use crate::results::QuestionResult;
use crate::statistics::{summarize, Summary};
use crate::traits::{GenerateRequest, GenerationOptions, Generator, TokenUsage};

/// Configuration for the eval engine.
#[derive(Debug, Clone)]
pub struct EvalEngineConfig {
    /// Maximum concurrent generation requests.
    pub parallelism: usize,
    /// Model identifier passed to the generator.
    pub model: String,
    /// Backend-specific generation options.
    pub options: GenerationOptions,
    /// Number of few-shot examples per prompt; all of the category when `None`.
    pub shots: Option<usize>,
    /// Seed for example sampling.
    pub seed: Option<u64>,
    /// Per-request timeout.
    pub request_timeout: Option<Duration>,
}

impl Default for EvalEngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            model: String::new(),
            options: GenerationOptions::new(),
            shots: None,
            seed: None,
            request_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_question_start(&self, index: usize);
    fn on_question_complete(&self, result: &QuestionResult);
    fn on_batch_complete(&self, summary: &Summary, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_question_start(&self, _: usize) {}
    fn on_question_complete(&self, _: &QuestionResult) {}
    fn on_batch_complete(&self, _: &Summary, _: Duration) {}
}

/// The batch eval engine.
pub struct EvalEngine {
    generator: Arc<dyn Generator>,
    config: EvalEngineConfig,
}

impl EvalEngine {
    pub fn new(generator: Arc<dyn Generator>, config: EvalEngineConfig) -> Self {
        Self { generator, config }
    }

    /// Build the prompt for every question.
    ///
    /// Runs before any request is sent so that sampling failures abort the
    /// batch without generation traffic.
    pub fn prepare(
        &self,
        examples: &QuestionSet,
        questions: &QuestionSet,
    ) -> Result<Vec<(McqRecord, String)>> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let prepared = questions
            .iter()
            .map(|mcq| -> Result<(McqRecord, String)> {
                let prompt = match self.config.shots {
                    Some(shots) => generate_prompt_with_shots(examples, mcq, shots, &mut rng)?,
                    None => generate_prompt(examples, mcq),
                };
                Ok((mcq.clone(), prompt))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(prepared)
    }

    /// Evaluate `questions` with few-shot prompts drawn from `examples`.
    pub async fn run(
        &self,
        examples: &QuestionSet,
        questions: &QuestionSet,
        dataset: DatasetSummary,
        progress: &dyn ProgressReporter,
    ) -> Result<EvalReport> {
        anyhow::ensure!(self.config.parallelism >= 1, "parallelism must be at least 1");

        let prepared = self.prepare(examples, questions)?;

        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism));

        let mut futures = FuturesUnordered::new();

        for (mcq, prompt) in prepared {
            let generator = Arc::clone(&self.generator);
            let semaphore = Arc::clone(&semaphore);
            let request = GenerateRequest {
                model: self.config.model.clone(),
                prompt,
                options: self.config.options.clone(),
            };
            let request_timeout = self.config.request_timeout;

            futures.push(async move {
                let _permit = semaphore.acquire_owned().await;
                progress.on_question_start(mcq.index);

                let gen_start = Instant::now();
                let call = generator.generate(&request);
                let generated = match request_timeout {
                    Some(limit) => match tokio::time::timeout(limit, call).await {
                        Ok(result) => result,
                        Err(_) => Err(anyhow::anyhow!(
                            "generation timed out after {}s",
                            limit.as_secs_f64()
                        )),
                    },
                    None => call.await,
                };
                let latency_ms = gen_start.elapsed().as_millis() as u64;

                match generated {
                    Ok(response) => {
                        let grade = grade(&mcq, &response.content);
                        QuestionResult {
                            index: mcq.index,
                            category: mcq.category,
                            expected: mcq.answer,
                            predicted: grade.predicted,
                            outcome: grade.outcome,
                            response: Some(response.content),
                            error: None,
                            latency_ms,
                            token_usage: response.token_usage,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(index = mcq.index, "generation failed: {e:#}");
                        QuestionResult {
                            index: mcq.index,
                            category: mcq.category,
                            expected: mcq.answer,
                            predicted: None,
                            outcome: Outcome::Error,
                            response: None,
                            error: Some(format!("{e:#}")),
                            latency_ms,
                            token_usage: TokenUsage::default(),
                        }
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(futures.len());
        while let Some(result) = futures.next().await {
            progress.on_question_complete(&result);
            results.push(result);
        }

        let elapsed = start.elapsed();
        let summary = summarize(&results, elapsed);
        progress.on_batch_complete(&summary, elapsed);

        tracing::info!(
            total = summary.total,
            correct = summary.correct,
            errors = summary.errors,
            accuracy = summary.accuracy,
            error_rate = summary.error_rate,
            rps = summary.requests_per_second,
            "batch complete"
        );

        Ok(EvalReport {
            id: run_id,
            created_at: chrono::Utc::now(),
            provider: self.generator.name().to_string(),
            model: self.config.model.clone(),
            prompt_version: PROMPT_VERSION,
            dataset,
            results,
            summary,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::fixtures::record;
    use crate::model::Letter;
    use crate::traits::{GenerateResponse, ModelInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies per target question, keyed by the question's index.
    struct ScriptedGenerator {
        replies: Vec<(String, Reply)>,
        calls: AtomicUsize,
    }

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<(usize, Reply)>) -> Self {
            Self {
                replies: replies
                    .into_iter()
                    .map(|(i, r)| (format!("Question: Question {i}?"), r))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .iter()
                .find(|(marker, _)| request.prompt.contains(marker.as_str()))
                .map(|(_, r)| r);
            let content = match reply {
                Some(Reply::Text(text)) => text.to_string(),
                Some(Reply::Fail) => anyhow::bail!("rate limited, retry after 1000ms"),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    String::new()
                }
                None => "no idea".to_string(),
            };
            Ok(GenerateResponse {
                content,
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn pools() -> (QuestionSet, QuestionSet) {
        let examples: QuestionSet = (100..104).map(|i| record(i, "math", Letter::A)).collect();
        let questions: QuestionSet = vec![
            record(0, "math", Letter::A),
            record(1, "math", Letter::B),
            record(2, "math", Letter::C),
            record(3, "math", Letter::D),
        ]
        .into_iter()
        .collect();
        (examples, questions)
    }

    fn config() -> EvalEngineConfig {
        EvalEngineConfig {
            parallelism: 2,
            model: "scripted-model".into(),
            request_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failures_only_affect_their_question() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            (0, Reply::Text("Sure! {\"answer\": \"A\"}")),
            (1, Reply::Text("{\"answer\": \"C\"}")),
            (2, Reply::Fail),
            (3, Reply::Hang),
        ]));
        let engine = EvalEngine::new(generator.clone(), config());
        let (examples, questions) = pools();
        let dataset = DatasetSummary::new("test", &examples, &questions);

        let report = engine
            .run(&examples, &questions, dataset, &NoopReporter)
            .await
            .unwrap();

        assert_eq!(report.results.len(), 4);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 4);
        assert_eq!(report.summary.correct, 1);
        assert_eq!(report.summary.incorrect, 1);
        assert_eq!(report.summary.errors, 2);
        assert_eq!(report.provider, "scripted");
        assert_eq!(report.prompt_version, PROMPT_VERSION);

        let by_index = |i: usize| report.results.iter().find(|r| r.index == i).unwrap();
        assert_eq!(by_index(1).predicted, Some(Letter::C));
        assert!(by_index(2).error.as_deref().unwrap().contains("rate limited"));
        assert!(by_index(3).error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn insufficient_examples_fail_before_generation() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let engine = EvalEngine::new(
            generator.clone(),
            EvalEngineConfig {
                shots: Some(5),
                seed: Some(1),
                ..config()
            },
        );
        let (examples, questions) = pools();

        let err = engine
            .run(&examples, &questions, DatasetSummary::default(), &NoopReporter)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InsufficientExamples { required: 5, available: 4, .. })
        ));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prepare_is_deterministic_with_seed() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let engine = EvalEngine::new(
            generator,
            EvalEngineConfig {
                shots: Some(2),
                seed: Some(11),
                ..config()
            },
        );
        let (examples, questions) = pools();

        let a = engine.prepare(&examples, &questions).unwrap();
        let b = engine.prepare(&examples, &questions).unwrap();
        assert_eq!(a, b);
        assert!(a[0].1.ends_with("Answer: "));
        assert_eq!(a[0].1.matches("Example Question:").count(), 2);
    }
}
