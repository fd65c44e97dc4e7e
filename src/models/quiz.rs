// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::config::DEFAULT_PASSING_PERCENTAGE;

/// Question kind. Decides which answer key applies and how responses
/// are graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "question_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    McqSingle,
    McqMultiple,
    TrueFalse,
    FillBlank,
}

/// One selectable option of a choice question.
/// Stored as part of the question's JSONB option list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub title: String,

    /// Minimum score (0-100) required to pass.
    pub passing_percentage: i64,

    /// Client-side time limit. The server scores late submissions normally.
    pub time_limit_minutes: Option<i64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
///
/// Created once at quiz-authoring time and immutable afterwards; answer
/// keys live in `options` (choice questions) or `answer` (fill-blank).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_type: QuestionType,
    pub text: String,
    pub points: i64,

    /// Ordered option list. Empty for fill-blank questions.
    pub options: Json<Vec<QuestionOption>>,

    /// Canonical answer for fill-blank questions.
    pub answer: Option<String>,

    pub order_index: i32,
}

/// DTO for a question as shown to students (answer key stripped).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_type: QuestionType,
    pub text: String,
    pub points: i64,
    pub options: Vec<String>,
    pub order_index: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            text: q.text,
            points: q.points,
            options: q.options.0.into_iter().map(|o| o.text).collect(),
            order_index: q.order_index,
        }
    }
}

/// Quiz detail as served to students.
#[derive(Debug, Serialize)]
pub struct QuizView {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a quiz together with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0, max = 100))]
    pub passing_percentage: Option<i64>,
    #[validate(range(min = 1))]
    pub time_limit_minutes: Option<i64>,
    #[validate(nested, length(max = 200))]
    pub questions: Vec<CreateQuestionRequest>,
}

impl CreateQuizRequest {
    pub fn passing_percentage_or_default(&self) -> i64 {
        self.passing_percentage.unwrap_or(DEFAULT_PASSING_PERCENTAGE)
    }
}

/// DTO for one question inside a quiz-creation request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(range(min = 1))]
    pub points: Option<i64>,
    #[validate(custom(function = validate_option_texts))]
    pub options: Option<Vec<QuestionOption>>,
    #[validate(length(min = 1, max = 500))]
    pub answer: Option<String>,
}

impl CreateQuestionRequest {
    /// Checks the type-dependent answer-key invariants the derive cannot
    /// express: choice questions need at least two options and a correct
    /// one, fill-blank needs a canonical answer.
    pub fn check_answer_key(&self) -> Result<(), String> {
        match self.question_type {
            QuestionType::McqSingle | QuestionType::McqMultiple | QuestionType::TrueFalse => {
                let options = self.options.as_deref().unwrap_or_default();
                if options.len() < 2 {
                    return Err(format!(
                        "Question '{}' needs at least 2 options",
                        self.text
                    ));
                }
                if !options.iter().any(|o| o.is_correct) {
                    return Err(format!(
                        "Question '{}' needs at least 1 correct option",
                        self.text
                    ));
                }
            }
            QuestionType::FillBlank => {
                if self.answer.as_deref().is_none_or(|a| a.trim().is_empty()) {
                    return Err(format!(
                        "Fill-blank question '{}' needs a canonical answer",
                        self.text
                    ));
                }
            }
        }
        Ok(())
    }
}

fn validate_option_texts(options: &[QuestionOption]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.text.is_empty() || opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_text_length"));
        }
    }
    Ok(())
}
