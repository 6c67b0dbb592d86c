//! The `mcqbias list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use mcqbias_providers::config::{create_provider, load_config_from, ProviderConfig};
use mcqbias_providers::OllamaGenerator;

pub async fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut names: Vec<String> = config.providers.keys().cloned().collect();
    if !names.iter().any(|n| n == &config.default_provider) {
        names.push(config.default_provider.clone());
    }
    names.sort();

    let mut found_any = false;

    for name in &names {
        if provider_filter.as_ref().is_some_and(|filter| filter != name) {
            continue;
        }

        let provider_config = config.provider(name)?;
        let models = match &provider_config {
            ProviderConfig::Ollama { base_url } => {
                match OllamaGenerator::new(base_url)?.list_models_async().await {
                    Ok(models) => models,
                    Err(e) => {
                        tracing::warn!(provider = %name, "could not list models: {e:#}");
                        continue;
                    }
                }
            }
            other => match create_provider(other) {
                Ok(provider) => provider.available_models(),
                Err(e) => {
                    tracing::warn!(provider = %name, "skipping: {e:#}");
                    continue;
                }
            },
        };

        if !models.is_empty() {
            found_any = true;
            println!("Provider: {name}");
            for model in &models {
                if model.max_context > 0 {
                    println!("  {} ({}, {}K context)", model.id, model.name, model.max_context / 1000);
                } else {
                    println!("  {}", model.id);
                }
            }
            println!();
        }
    }

    if !found_any {
        println!("No models found. Run `mcqbias init` to create a config file.");
    }

    Ok(())
}
