// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    engine::{progress::StepId, scorer},
    error::AppError,
    models::{
        attempt::{AttemptHistory, AttemptResult, QuizAttempt, SubmitAttemptRequest},
        quiz::{CreateQuizRequest, PublicQuestion, Question, Quiz, QuizView},
    },
    utils::jwt::Claims,
};

use super::progress::{apply_completion, require_enrollment};

async fn fetch_quiz(pool: &PgPool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

async fn fetch_questions(pool: &PgPool, quiz_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY order_index",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Creates a quiz together with its questions.
///
/// Questions are immutable once created; the answer-key invariants
/// (choice questions: >= 2 options, >= 1 correct; fill-blank: canonical
/// answer) are enforced here, at authoring time.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    for question in &payload.questions {
        question.check_answer_key().map_err(AppError::BadRequest)?;
    }

    let course = sqlx::query_as::<_, (i64,)>("SELECT instructor_id FROM courses WHERE id = $1")
        .bind(payload.course_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if course.0 != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the course instructor can add quizzes".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let quiz_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes (course_id, title, passing_percentage, time_limit_minutes)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(payload.course_id)
    .bind(&payload.title)
    .bind(payload.passing_percentage_or_default())
    .bind(payload.time_limit_minutes)
    .fetch_one(&mut *tx)
    .await?;

    for (index, question) in payload.questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions (quiz_id, question_type, text, points, options, answer, order_index)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(quiz_id)
        .bind(question.question_type)
        .bind(&question.text)
        .bind(question.points.unwrap_or(1))
        .bind(SqlJson(question.options.clone().unwrap_or_default()))
        .bind(&question.answer)
        .bind(index as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": quiz_id })),
    ))
}

/// Returns a quiz with its questions, answer keys stripped.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    let questions = fetch_questions(&pool, quiz_id).await?;

    Ok(Json(QuizView {
        quiz,
        questions: questions.into_iter().map(PublicQuestion::from).collect(),
    }))
}

/// Deletes a quiz. Blocked while any content item still references it.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, quiz_id).await?;

    let referencing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM content_items WHERE quiz_id = $1",
    )
    .bind(quiz_id)
    .fetch_one(&pool)
    .await?;

    if referencing > 0 {
        return Err(AppError::Conflict(
            "Quiz is still linked to course content".to_string(),
        ));
    }

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Submits a quiz attempt: grades every question, persists the immutable
/// attempt row, and on a pass marks the linked content complete and
/// recomputes the enrollment, all before responding.
///
/// Grading never rejects a malformed answer; it degrades to incorrect.
/// Only an unknown quiz is a caller-visible error. A late submission
/// (past the client-side time limit) is scored normally.
pub async fn submit_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let student_id = claims.user_id();
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    let questions = fetch_questions(&pool, quiz_id).await?;

    let responses = scorer::response_map(
        payload
            .responses
            .into_iter()
            .map(|r| (r.question_id, r.response)),
    );
    let scored = scorer::score_attempt(&questions, &responses, quiz.passing_percentage);

    // Best-effort sequence number: a concurrent submission may observe the
    // same count. It orders history, nothing enforces uniqueness.
    let prior_attempts = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_attempts WHERE student_id = $1 AND quiz_id = $2",
    )
    .bind(student_id)
    .bind(quiz_id)
    .fetch_one(&pool)
    .await?;
    let attempt_number = prior_attempts + 1;

    let mut tx = pool.begin().await?;

    let attempt_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quiz_attempts
            (student_id, quiz_id, course_id, answers, score, earned_points,
             total_points, passed, attempt_number, time_spent_seconds)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(quiz_id)
    .bind(quiz.course_id)
    .bind(SqlJson(scored.answers.clone()))
    .bind(scored.score)
    .bind(scored.earned_points)
    .bind(scored.total_points)
    .bind(scored.passed)
    .bind(attempt_number)
    .bind(payload.time_spent_seconds)
    .fetch_one(&mut *tx)
    .await?;

    if scored.passed {
        let linked_content = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM content_items WHERE quiz_id = $1",
        )
        .bind(quiz_id)
        .fetch_all(&mut *tx)
        .await?;

        let enrolled = require_enrollment(&mut *tx, student_id, quiz.course_id)
            .await
            .is_ok();

        if enrolled {
            if linked_content.is_empty() {
                // Standalone quiz: no step to mark, but passing is activity.
                sqlx::query(
                    "UPDATE enrollments SET last_activity = NOW() WHERE student_id = $1 AND course_id = $2",
                )
                .bind(student_id)
                .bind(quiz.course_id)
                .execute(&mut *tx)
                .await?;
            } else {
                let mut steps: Vec<StepId> =
                    linked_content.into_iter().map(StepId::Content).collect();
                steps.push(StepId::Quiz(quiz_id));
                apply_completion(&mut tx, student_id, quiz.course_id, &steps).await?;
            }
        } else {
            tracing::debug!(
                "Student {} passed quiz {} without an enrollment; skipping progress update",
                student_id,
                quiz_id
            );
        }
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(AttemptResult {
            attempt_id,
            score: scored.score,
            earned_points: scored.earned_points,
            total_points: scored.total_points,
            passed: scored.passed,
            attempt_number,
            answers: scored.answers,
        }),
    ))
}

/// Lists the caller's attempts on a quiz, oldest first, plus the best
/// attempt (highest score; ties go to the earliest submission).
pub async fn list_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, quiz_id).await?;

    let attempts = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT * FROM quiz_attempts
        WHERE student_id = $1 AND quiz_id = $2
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(claims.user_id())
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    // Oldest-first order makes this keep the earliest attempt on ties.
    let best = attempts
        .iter()
        .cloned()
        .reduce(|best, attempt| if attempt.score > best.score { attempt } else { best });

    Ok(Json(AttemptHistory { attempts, best }))
}
