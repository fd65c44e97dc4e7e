// src/engine/grader.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::quiz::{Question, QuestionOption, QuestionType};

/// A student's typed response to a single question. The tag mirrors the
/// question type, so grading can dispatch on the (question, response) pair
/// and treat any mismatch as a wrong answer instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionResponse {
    McqSingle { selected: i64 },
    McqMultiple { selected: Vec<i64> },
    TrueFalse { selected: i64 },
    FillBlank { text: String },
}

/// Outcome of grading one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeResult {
    pub is_correct: bool,
    pub points_earned: i64,
}

impl GradeResult {
    fn incorrect() -> Self {
        GradeResult {
            is_correct: false,
            points_earned: 0,
        }
    }
}

/// Grades one question against one (possibly absent) response.
///
/// Deterministic and total: a missing response, an out-of-range option
/// index, or a response whose shape does not match the question type all
/// grade as incorrect for zero points. Grading never fails.
pub fn grade(question: &Question, response: Option<&QuestionResponse>) -> GradeResult {
    let Some(response) = response else {
        return GradeResult::incorrect();
    };

    let is_correct = match (question.question_type, response) {
        (
            QuestionType::McqSingle | QuestionType::TrueFalse,
            QuestionResponse::McqSingle { selected } | QuestionResponse::TrueFalse { selected },
        ) => selected_option_is_correct(&question.options, *selected),

        // Exact set equality. Partial credit is never awarded, so any
        // subset or superset of the correct set is simply wrong.
        (QuestionType::McqMultiple, QuestionResponse::McqMultiple { selected }) => {
            let chosen: BTreeSet<i64> = selected.iter().copied().collect();
            !chosen.is_empty() && chosen == correct_option_indices(&question.options)
        }

        (QuestionType::FillBlank, QuestionResponse::FillBlank { text }) => question
            .answer
            .as_deref()
            .is_some_and(|key| normalize_text(text) == normalize_text(key)),

        // Response shape does not match the question type.
        _ => false,
    };

    GradeResult {
        is_correct,
        points_earned: if is_correct { question.points } else { 0 },
    }
}

/// Indices of the options flagged correct, as a set.
pub fn correct_option_indices(options: &[QuestionOption]) -> BTreeSet<i64> {
    options
        .iter()
        .enumerate()
        .filter(|(_, o)| o.is_correct)
        .map(|(i, _)| i as i64)
        .collect()
}

fn selected_option_is_correct(options: &[QuestionOption], selected: i64) -> bool {
    usize::try_from(selected)
        .ok()
        .and_then(|i| options.get(i))
        .is_some_and(|o| o.is_correct)
}

fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
