//! mcqbias-providers: Text-generation backends.
//!
//! Implements the `Generator` trait for OpenAI-compatible APIs and Ollama,
//! plus a mock backend for tests and a retrying decorator for transient
//! provider failures.

pub mod config;
pub mod error;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod retry;

pub use config::{
    create_generator, create_provider, load_config, load_config_from, McqBiasConfig, ProviderConfig,
};
pub use error::ProviderError;
pub use mock::MockGenerator;
pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;
pub use retry::RetryingGenerator;
