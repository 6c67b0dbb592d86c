//! Few-shot prompt construction.
//!
//! The rendered text is a fixed protocol: the response grader and every
//! backend rely on it. Bump [`PROMPT_VERSION`] whenever the literal layout
//! changes.

use std::fmt::Write;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CoreError;
use crate::model::{McqRecord, QuestionSet};

/// Version of the prompt layout rendered by [`render_prompt`].
pub const PROMPT_VERSION: u32 = 1;

/// Build the prompt for `mcq` using every example of its category.
///
/// Deterministic: examples appear in the order they have in `examples`.
pub fn generate_prompt(examples: &QuestionSet, mcq: &McqRecord) -> String {
    let selected: Vec<&McqRecord> = examples.in_category(&mcq.category).collect();
    render_prompt(&selected, mcq)
}

/// Build the prompt for `mcq` using `shots` randomly chosen examples of its
/// category.
pub fn generate_prompt_with_shots<R: Rng + ?Sized>(
    examples: &QuestionSet,
    mcq: &McqRecord,
    shots: usize,
    rng: &mut R,
) -> Result<String, CoreError> {
    let selected = select_examples(examples, &mcq.category, shots, rng)?;
    Ok(render_prompt(&selected, mcq))
}

/// Randomly choose `shots` examples of `category`.
pub fn select_examples<'a, R: Rng + ?Sized>(
    examples: &'a QuestionSet,
    category: &str,
    shots: usize,
    rng: &mut R,
) -> Result<Vec<&'a McqRecord>, CoreError> {
    let pool: Vec<&McqRecord> = examples.iter().filter(|r| r.category == category).collect();
    if pool.len() < shots {
        return Err(CoreError::InsufficientExamples {
            category: category.to_string(),
            required: shots,
            available: pool.len(),
        });
    }
    Ok(pool.choose_multiple(rng, shots).copied().collect())
}

/// Render the prompt text from an ordered example slice and the target.
pub fn render_prompt(examples: &[&McqRecord], mcq: &McqRecord) -> String {
    let mut content = format!(
        "You are a robot that only outputs JSON. \
         You reply in JSON format with the field 'answer'. \
         For example, the following are multiple choice questions about {}.\n\n",
        mcq.category
    );

    for example in examples {
        let _ = write!(content, "Example Question: {}\n\n", example.question);
        push_choices(&mut content, example);
        let _ = write!(
            content,
            "\nExample Answer: {{\"answer\": \"{}\"}}\n\n",
            example.answer
        );
    }

    content.push_str("Given the examples above, your task is to answer the following question.\n\n");
    let _ = write!(content, "Question: {}\n\n", mcq.question);
    push_choices(&mut content, mcq);
    content.push_str("\nAnswer: ");

    content
}

fn push_choices(content: &mut String, record: &McqRecord) {
    for (letter, text) in record.choices.iter() {
        let _ = writeln!(content, "{letter}) {text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Choices, Letter};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn math_example() -> McqRecord {
        McqRecord {
            index: 0,
            question: "What is 1 + 1?".into(),
            choices: Choices::new("2", "3", "4", "5"),
            answer: Letter::A,
            category: "math".into(),
        }
    }

    fn math_question() -> McqRecord {
        McqRecord {
            index: 7,
            question: "What is the value of p in 24 = 2p?".into(),
            choices: Choices::new("p = 4", "p = 8", "p = 12", "p = 24"),
            answer: Letter::C,
            category: "math".into(),
        }
    }

    const EXPECTED: &str = "You are a robot that only outputs JSON. You reply in JSON format with the field 'answer'. For example, the following are multiple choice questions about math.

Example Question: What is 1 + 1?

A) 2
B) 3
C) 4
D) 5

Example Answer: {\"answer\": \"A\"}

Given the examples above, your task is to answer the following question.

Question: What is the value of p in 24 = 2p?

A) p = 4
B) p = 8
C) p = 12
D) p = 24

Answer: ";

    #[test]
    fn prompt_matches_literal_template() {
        let examples = QuestionSet::new(vec![math_example()]);
        let prompt = generate_prompt(&examples, &math_question());
        assert_eq!(prompt, EXPECTED);
    }

    #[test]
    fn prompt_ignores_other_categories() {
        let mut physics = math_example();
        physics.index = 1;
        physics.category = "physics".into();
        physics.question = "What is inertia?".into();

        let examples = QuestionSet::new(vec![physics, math_example()]);
        let prompt = generate_prompt(&examples, &math_question());
        assert_eq!(prompt, EXPECTED);
    }

    #[test]
    fn prompt_without_examples_still_poses_question() {
        let prompt = generate_prompt(&QuestionSet::default(), &math_question());
        assert!(prompt.starts_with("You are a robot"));
        assert!(!prompt.contains("Example Question"));
        assert!(prompt.ends_with("D) p = 24\n\nAnswer: "));
    }

    #[test]
    fn examples_render_in_pool_order() {
        let mut second = math_example();
        second.index = 1;
        second.question = "What is 2 + 2?".into();
        second.answer = Letter::C;

        let examples = QuestionSet::new(vec![math_example(), second]);
        let prompt = generate_prompt(&examples, &math_question());

        let first_at = prompt.find("What is 1 + 1?").unwrap();
        let second_at = prompt.find("What is 2 + 2?").unwrap();
        assert!(first_at < second_at);
        assert!(prompt.contains("Example Answer: {\"answer\": \"C\"}\n\n"));
    }

    #[test]
    fn shots_are_seeded_and_checked() {
        let examples: QuestionSet = (0..5)
            .map(|i| {
                let mut r = math_example();
                r.index = i;
                r.question = format!("Example {i}?");
                r
            })
            .collect();

        let a = generate_prompt_with_shots(&examples, &math_question(), 2, &mut StdRng::seed_from_u64(5))
            .unwrap();
        let b = generate_prompt_with_shots(&examples, &math_question(), 2, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.matches("Example Question:").count(), 2);

        let err = generate_prompt_with_shots(&examples, &math_question(), 6, &mut StdRng::seed_from_u64(5))
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientExamples {
                category: "math".into(),
                required: 6,
                available: 5,
            }
        );
    }
}
