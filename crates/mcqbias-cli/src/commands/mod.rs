pub mod debias;
pub mod init;
pub mod list_models;
pub mod prompt;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use mcqbias_core::Letter;

/// Parse an optional `--golden-option` value.
pub(crate) fn parse_golden(value: Option<&str>) -> Result<Option<Letter>> {
    value
        .map(|v| v.parse::<Letter>().context("invalid --golden-option"))
        .transpose()
}

/// Seeded RNG when a seed is given, entropy-seeded otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
