// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::engine::grader::QuestionResponse;
use crate::engine::scorer::GradedAnswer;

/// Represents the 'quiz_attempts' table in the database.
///
/// One row per submission, immutable after creation. `attempt_number` is a
/// 1-based display ordinal scoped to (student, quiz); it is computed from a
/// count read and carries no uniqueness guarantee under races.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub course_id: i64,

    /// Per-question graded answers, stored as JSONB.
    pub answers: Json<Vec<GradedAnswer>>,

    /// Rounded percentage score, 0-100.
    pub score: i64,
    pub earned_points: i64,
    pub total_points: i64,
    pub passed: bool,
    pub attempt_number: i64,
    pub time_spent_seconds: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One submitted answer: the target question plus the typed response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmittedResponse {
    pub question_id: i64,
    #[serde(flatten)]
    pub response: QuestionResponse,
}

/// DTO for submitting a quiz attempt. A missing `responses` list is
/// rejected at the boundary; an empty one is scorable (an abandoned
/// attempt still grades, as all zeros).
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(length(max = 500))]
    pub responses: Vec<SubmittedResponse>,
    #[validate(range(min = 0))]
    pub time_spent_seconds: Option<i64>,
}

/// Response body for a graded submission.
#[derive(Debug, Serialize)]
pub struct AttemptResult {
    pub attempt_id: i64,
    pub score: i64,
    pub earned_points: i64,
    pub total_points: i64,
    pub passed: bool,
    pub attempt_number: i64,
    pub answers: Vec<GradedAnswer>,
}

/// Attempt history response: every attempt plus the best one
/// (highest score, earliest submission on ties).
#[derive(Debug, Serialize)]
pub struct AttemptHistory {
    pub attempts: Vec<QuizAttempt>,
    pub best: Option<QuizAttempt>,
}
