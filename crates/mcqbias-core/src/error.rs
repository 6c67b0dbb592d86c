//! Core error types.
//!
//! These are setup-phase failures: they signal a structural problem with the
//! dataset or the requested configuration and abort a run before any
//! generation traffic is sent. Per-question failures never surface here;
//! they collapse into [`Outcome::Error`](crate::model::Outcome::Error).

use thiserror::Error;

/// Errors raised by option swapping, debiasing, and example sampling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A requested letter is not part of the option alphabet.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// A category or pool lacks enough records to satisfy a sampling request.
    #[error("insufficient examples for '{category}': required {required}, available {available}")]
    InsufficientExamples {
        category: String,
        required: usize,
        available: usize,
    },
}
