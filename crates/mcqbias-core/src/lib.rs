//! mcqbias-core: Bias-controlled multiple-choice evaluation.
//!
//! This crate holds the data model and the pipeline the rest of mcqbias
//! builds on: option swapping, answer debiasing, deterministic few-shot
//! prompts, response grading, and the batch engine that ties them to a
//! [`Generator`](traits::Generator).

pub mod dataset;
pub mod debias;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod prompt;
pub mod report;
pub mod results;
pub mod statistics;
pub mod swap;
pub mod traits;

pub use error::CoreError;
pub use model::{Choices, Letter, McqRecord, Outcome, QuestionSet, Segment, OPTIONS};
