// src/handlers/progress.rs

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    engine::{
        lock,
        progress::{self, ProgressSummary, StepId},
    },
    error::AppError,
    models::{
        course::ContentItem,
        enrollment::{Enrollment, EnrollmentProgress, EnrollmentStatus, ProgressRecord},
    },
    utils::jwt::Claims,
};

/// Helper struct for reading the completed-step log.
#[derive(sqlx::FromRow)]
struct CompletedStep {
    step_kind: crate::models::enrollment::StepKind,
    item_id: i64,
}

/// Loads a course's content in total (module order, item order) order.
/// This ordering is the locking sequence.
pub async fn course_content_in_order<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    course_id: i64,
) -> Result<Vec<ContentItem>, AppError> {
    let items = sqlx::query_as::<_, ContentItem>(
        r#"
        SELECT c.id, c.module_id, c.title, c.content_type, c.body, c.video_url,
               c.quiz_id, c.order_index
        FROM content_items c
        JOIN course_modules m ON c.module_id = m.id
        WHERE m.course_id = $1
        ORDER BY m.order_index, c.order_index
        "#,
    )
    .bind(course_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

/// Loads the authoritative completed-set for (student, course). Progress
/// rows are the single source of truth; nothing else caches completion.
pub async fn completed_step_set<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    student_id: i64,
    course_id: i64,
) -> Result<HashSet<StepId>, AppError> {
    let rows = sqlx::query_as::<_, CompletedStep>(
        "SELECT step_kind, item_id FROM progress_records WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StepId::from_parts(row.step_kind, row.item_id))
        .collect())
}

/// Fetches the student's enrollment, or `Forbidden` when there is none.
pub async fn require_enrollment<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    student_id: i64,
    course_id: i64,
) -> Result<Enrollment, AppError> {
    sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::Forbidden(
        "Not enrolled in this course".to_string(),
    ))
}

/// Records completion steps and rolls the enrollment forward, all inside
/// the caller's transaction.
///
/// Inserts are set-semantics (`ON CONFLICT DO NOTHING`), so re-marking a
/// step is a no-op and the recompute from the stored set cannot double
/// count. The percentage never moves backwards here; only an explicit
/// reset does that.
pub async fn apply_completion(
    tx: &mut Transaction<'_, Postgres>,
    student_id: i64,
    course_id: i64,
    steps: &[StepId],
) -> Result<ProgressSummary, AppError> {
    for step in steps {
        sqlx::query(
            r#"
            INSERT INTO progress_records (student_id, course_id, step_kind, item_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (student_id, step_kind, item_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .bind(step.kind())
        .bind(step.item_id())
        .execute(&mut **tx)
        .await?;
    }

    let content = course_content_in_order(&mut **tx, course_id).await?;
    let inventory = progress::course_steps(&content);
    let completed = completed_step_set(&mut **tx, student_id, course_id).await?;

    let summary = progress::recompute(&inventory, &completed);

    // A completed enrollment only reopens through an explicit reset.
    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress_percentage = GREATEST(progress_percentage, $1),
            status = CASE WHEN $2 THEN 'completed'::enrollment_status ELSE status END,
            last_activity = NOW()
        WHERE student_id = $3 AND course_id = $4
        "#,
    )
    .bind(summary.percentage)
    .bind(summary.should_complete)
    .bind(student_id)
    .bind(course_id)
    .execute(&mut **tx)
    .await?;

    Ok(summary)
}

/// Marks a content item complete for the current student and recomputes
/// the enrollment progress inline.
///
/// * 404 if the item does not exist under that course/module.
/// * 403 if the student has no enrollment.
/// * Idempotent: re-marking returns the same state.
pub async fn mark_content_complete(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, module_id, content_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();

    let item = sqlx::query_as::<_, ContentItem>(
        r#"
        SELECT c.id, c.module_id, c.title, c.content_type, c.body, c.video_url,
               c.quiz_id, c.order_index
        FROM content_items c
        JOIN course_modules m ON c.module_id = m.id
        WHERE c.id = $1 AND c.module_id = $2 AND m.course_id = $3
        "#,
    )
    .bind(content_id)
    .bind(module_id)
    .bind(course_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Content item not found".to_string()))?;

    require_enrollment(&pool, student_id, course_id).await?;

    let mut tx = pool.begin().await?;
    let summary = apply_completion(&mut tx, student_id, course_id, &[StepId::Content(item.id)]).await?;
    let record = sqlx::query_as::<_, ProgressRecord>(
        r#"
        SELECT * FROM progress_records
        WHERE student_id = $1 AND step_kind = 'content' AND item_id = $2
        "#,
    )
    .bind(student_id)
    .bind(item.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "progress": record,
        "percentage": summary.percentage,
        "course_completed": summary.should_complete,
    })))
}

/// Returns the enrollment's progress percentage and status.
pub async fn get_enrollment_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let enrollment = require_enrollment(&pool, claims.user_id(), course_id).await?;

    Ok(Json(EnrollmentProgress {
        percentage: enrollment.progress_percentage,
        status: enrollment.status,
    }))
}

/// Read-only projection of the content ids currently locked for the
/// student. Derived on every call; never persisted.
pub async fn get_locked_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();
    require_enrollment(&pool, student_id, course_id).await?;

    let content = course_content_in_order(&pool, course_id).await?;
    let completed = completed_step_set(&pool, student_id, course_id).await?;

    let mut locked: Vec<i64> = lock::locked_content_ids(&content, &completed)
        .into_iter()
        .collect();
    locked.sort_unstable();

    Ok(Json(serde_json::json!({ "locked_content_ids": locked })))
}

/// Wipes the student's progress for a course: deletes the completion log,
/// zeroes the percentage and reactivates the enrollment. The only path
/// that ever deletes progress history.
pub async fn reset_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();
    require_enrollment(&pool, student_id, course_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM progress_records WHERE student_id = $1 AND course_id = $2")
        .bind(student_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress_percentage = 0, status = 'active', last_activity = NOW()
        WHERE student_id = $1 AND course_id = $2
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(EnrollmentProgress {
        percentage: 0,
        status: EnrollmentStatus::Active,
    }))
}

/// Escape hatch: marks the course completed right away, bypassing the
/// step count. Idempotent.
pub async fn force_complete_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();
    require_enrollment(&pool, student_id, course_id).await?;

    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress_percentage = 100, status = 'completed', last_activity = NOW()
        WHERE student_id = $1 AND course_id = $2
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .execute(&pool)
    .await?;

    Ok(Json(EnrollmentProgress {
        percentage: 100,
        status: EnrollmentStatus::Completed,
    }))
}
