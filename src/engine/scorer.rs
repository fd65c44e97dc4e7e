// src/engine/scorer.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::grader::{self, QuestionResponse};
use crate::models::quiz::Question;

/// One question's graded outcome, as persisted on the attempt row and
/// echoed back to the submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub response: Option<QuestionResponse>,
    pub is_correct: bool,
    pub points_earned: i64,
}

/// Aggregate result of grading a full submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredAttempt {
    pub answers: Vec<GradedAnswer>,
    pub earned_points: i64,
    pub total_points: i64,

    /// Rounded percentage, 0-100. Zero for a quiz worth zero points.
    pub score: i64,
    pub passed: bool,
}

/// Grades a submission against every question of the quiz.
///
/// Unanswered questions grade as incorrect but still count toward the
/// total, so an abandoned attempt scores like any other. `score` rounds
/// half-up; `passed` compares the rounded score to the threshold.
pub fn score_attempt(
    questions: &[Question],
    responses: &HashMap<i64, QuestionResponse>,
    passing_percentage: i64,
) -> ScoredAttempt {
    let mut answers = Vec::with_capacity(questions.len());
    let mut earned_points = 0;
    let mut total_points = 0;

    for question in questions {
        let response = responses.get(&question.id);
        let result = grader::grade(question, response);

        earned_points += result.points_earned;
        total_points += question.points;

        answers.push(GradedAnswer {
            question_id: question.id,
            response: response.cloned(),
            is_correct: result.is_correct,
            points_earned: result.points_earned,
        });
    }

    let score = percentage_score(earned_points, total_points);

    ScoredAttempt {
        answers,
        earned_points,
        total_points,
        score,
        passed: score >= passing_percentage,
    }
}

/// Rounded percentage of earned over total, half-up. Zero when the total
/// is zero (an empty quiz is scorable, not an error).
fn percentage_score(earned: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((earned * 100) as f64 / total as f64).round() as i64
}

/// Collapses a submitted response list into a per-question map. When a
/// question id appears more than once the last occurrence wins.
pub fn response_map(
    responses: impl IntoIterator<Item = (i64, QuestionResponse)>,
) -> HashMap<i64, QuestionResponse> {
    responses.into_iter().collect()
}
