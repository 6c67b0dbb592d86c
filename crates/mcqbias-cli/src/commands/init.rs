//! The `mcqbias init` command.

use std::path::Path;

use anyhow::Result;

use mcqbias_providers::config::CONFIG_FILE_NAME;

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, SAMPLE_CONFIG)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    println!("\nNext steps:");
    println!("  1. Download MMLU into .build/datasets/mmlu (dev/ and test/ CSV folders)");
    println!("  2. Run: mcqbias validate --datasets .build/datasets/mmlu");
    println!("  3. Run: mcqbias run --sample 20 --option num_predict=10");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mcqbias configuration

default_provider = "ollama"
default_model = "llama3.2:3b"
parallelism = 4
max_retries = 3
retry_delay_ms = 1000
timeout_secs = 300
datasets_path = ".build/datasets/mmlu"
output_dir = "./mcqbias-results"
# seed = 42

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"
"#;
