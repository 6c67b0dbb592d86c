//! Response grading.
//!
//! Extracts a JSON `{"answer": "<letter>"}` object from free-form model output
//! and compares it with the ground truth. Malformed output is never an error
//! for the caller; it grades as [`Outcome::Error`] so a batch keeps going.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Letter, McqRecord, Outcome};

/// Why a response could not be graded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedResponse {
    #[error("no JSON object in response")]
    NoJsonObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing 'answer' field")]
    MissingAnswer,

    #[error("invalid answer: {0}")]
    InvalidLetter(String),
}

/// Grading result with the letter the model picked, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub outcome: Outcome,
    pub predicted: Option<Letter>,
}

/// Extract the answer letter from a raw model response.
///
/// Text before the first `{` and after the last `}` is ignored.
pub fn extract_answer(response: &str) -> Result<Letter, MalformedResponse> {
    let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) else {
        return Err(MalformedResponse::NoJsonObject);
    };
    if end < start {
        return Err(MalformedResponse::NoJsonObject);
    }

    let value: serde_json::Value = serde_json::from_str(&response[start..=end])
        .map_err(|e| MalformedResponse::InvalidJson(e.to_string()))?;

    let answer = value.get("answer").ok_or(MalformedResponse::MissingAnswer)?;
    let Some(answer) = answer.as_str() else {
        return Err(MalformedResponse::InvalidLetter(answer.to_string()));
    };

    answer
        .parse()
        .map_err(|_| MalformedResponse::InvalidLetter(answer.to_string()))
}

/// Grade a response and keep the predicted letter.
pub fn grade(mcq: &McqRecord, response: &str) -> Grade {
    match extract_answer(response) {
        Ok(letter) => Grade {
            outcome: if letter == mcq.answer {
                Outcome::Correct
            } else {
                Outcome::Incorrect
            },
            predicted: Some(letter),
        },
        Err(e) => {
            tracing::debug!(index = mcq.index, "malformed response: {e}");
            Grade {
                outcome: Outcome::Error,
                predicted: None,
            }
        }
    }
}

/// Evaluate response for the specified question.
pub fn evaluate_answer(mcq: &McqRecord, response: &str) -> Outcome {
    grade(mcq, response).outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::record;
    use crate::model::OPTIONS;

    #[test]
    fn exact_json_is_correct_for_every_letter() {
        for letter in OPTIONS {
            let mcq = record(0, "math", letter);
            let response = format!("{{\"answer\": \"{letter}\"}}");
            assert_eq!(evaluate_answer(&mcq, &response), Outcome::Correct);
        }
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let response = "Sure! {\"answer\": \"C\"} thanks";
        assert_eq!(evaluate_answer(&record(0, "math", Letter::C), response), Outcome::Correct);
        assert_eq!(evaluate_answer(&record(0, "math", Letter::B), response), Outcome::Incorrect);
    }

    #[test]
    fn grade_keeps_predicted_letter() {
        let grade = grade(&record(0, "math", Letter::A), "{\"answer\": \"D\"}");
        assert_eq!(grade.outcome, Outcome::Incorrect);
        assert_eq!(grade.predicted, Some(Letter::D));
    }

    #[test]
    fn malformed_responses_are_errors() {
        let mcq = record(0, "math", Letter::A);
        let cases = [
            "",
            "A",
            "The answer is A",
            "{\"answer\": \"A\"",
            "\"answer\": \"A\"}",
            "} {",
            "{answer: A}",
            "{\"choice\": \"A\"}",
            "{\"answer\": \"E\"}",
            "{\"answer\": \"a\"}",
            "{\"answer\": 1}",
            "{\"answer\": null}",
            "[\"A\"]",
            "{\"answer\": \"A\"} and {\"answer\": \"B\"}",
        ];
        for response in cases {
            let grade = grade(&mcq, response);
            assert_eq!(grade.outcome, Outcome::Error, "response: {response:?}");
            assert_eq!(grade.predicted, None);
        }
    }

    #[test]
    fn extract_reports_reason() {
        assert_eq!(extract_answer("no braces"), Err(MalformedResponse::NoJsonObject));
        assert_eq!(extract_answer("} then {"), Err(MalformedResponse::NoJsonObject));
        assert!(matches!(
            extract_answer("{not json}"),
            Err(MalformedResponse::InvalidJson(_))
        ));
        assert_eq!(
            extract_answer("{\"other\": \"A\"}"),
            Err(MalformedResponse::MissingAnswer)
        );
        assert_eq!(
            extract_answer("{\"answer\": \"Z\"}"),
            Err(MalformedResponse::InvalidLetter("Z".into()))
        );
        assert_eq!(extract_answer("```json\n{\"answer\": \"B\"}\n```"), Ok(Letter::B));
    }
}
