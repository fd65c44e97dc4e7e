// src/handlers/course.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    engine::{lock, progress},
    error::AppError,
    models::{
        course::{
            ContentType, Course, CourseDetail, CourseModule, CreateContentRequest,
            CreateCourseRequest, CreateModuleRequest, LockedContentItem, ModuleDetail,
        },
        enrollment::{Enrollment, StudentOverview},
    },
    utils::{html::clean_html, jwt::Claims},
};

use super::progress::{completed_step_set, course_content_in_order, require_enrollment};

async fn fetch_course(pool: &PgPool, course_id: i64) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))
}

fn require_owner(course: &Course, claims: &Claims) -> Result<(), AppError> {
    if course.instructor_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the course instructor can modify this course".to_string(),
        ));
    }
    Ok(())
}

fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
        AppError::Conflict(message.to_string())
    } else {
        AppError::from(e)
    }
}

/// Creates a new course owned by the calling instructor.
pub async fn create_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO courses (title, description, instructor_id)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Lists all courses, newest first.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY created_at DESC")
        .fetch_all(&pool)
        .await?;

    Ok(Json(courses))
}

/// Returns a course with its ordered modules and their content.
pub async fn get_course(
    State(pool): State<PgPool>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, course_id).await?;

    let modules = sqlx::query_as::<_, CourseModule>(
        "SELECT * FROM course_modules WHERE course_id = $1 ORDER BY order_index",
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    let content = course_content_in_order(&pool, course_id).await?;

    let modules = modules
        .into_iter()
        .map(|module| {
            let module_content = content
                .iter()
                .filter(|c| c.module_id == module.id)
                .cloned()
                .collect();
            ModuleDetail {
                module,
                content: module_content,
            }
        })
        .collect();

    Ok(Json(CourseDetail { course, modules }))
}

/// Adds a module to a course. Order indexes are unique per course.
pub async fn create_module(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let course = fetch_course(&pool, course_id).await?;
    require_owner(&course, &claims)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO course_modules (course_id, title, order_index)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind(&payload.title)
    .bind(payload.order_index)
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_on_unique(e, "Module order index already in use"))?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Adds a content item to a module.
///
/// Videos need a source URL, text items a body (sanitized before
/// storage), quiz placeholders a quiz reference. A referenced quiz must
/// belong to the same course.
pub async fn create_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, module_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let course = fetch_course(&pool, course_id).await?;
    require_owner(&course, &claims)?;

    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM course_modules WHERE id = $1 AND course_id = $2",
    )
    .bind(module_id)
    .bind(course_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Module not found".to_string()))?;

    match payload.content_type {
        ContentType::Video if payload.video_url.is_none() => {
            return Err(AppError::BadRequest(
                "Video content needs a video_url".to_string(),
            ));
        }
        ContentType::Text if payload.body.is_none() => {
            return Err(AppError::BadRequest(
                "Text content needs a body".to_string(),
            ));
        }
        ContentType::Quiz if payload.quiz_id.is_none() => {
            return Err(AppError::BadRequest(
                "Quiz content needs a quiz_id".to_string(),
            ));
        }
        _ => {}
    }

    if let Some(quiz_id) = payload.quiz_id {
        let quiz_course = sqlx::query_scalar::<_, i64>("SELECT course_id FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Linked quiz not found".to_string()))?;

        if quiz_course != course_id {
            return Err(AppError::BadRequest(
                "Linked quiz belongs to another course".to_string(),
            ));
        }
    }

    let body = payload.body.as_deref().map(clean_html);

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO content_items (module_id, title, content_type, body, video_url, quiz_id, order_index)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(module_id)
    .bind(&payload.title)
    .bind(payload.content_type)
    .bind(body)
    .bind(&payload.video_url)
    .bind(payload.quiz_id)
    .bind(payload.order_index)
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_on_unique(e, "Content order index already in use"))?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Enrolls the calling student in a course. Re-enrolling is a no-op that
/// returns the existing enrollment.
pub async fn enroll(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_course(&pool, course_id).await?;
    let student_id = claims.user_id();

    sqlx::query(
        r#"
        INSERT INTO enrollments (student_id, course_id)
        VALUES ($1, $2)
        ON CONFLICT (student_id, course_id) DO NOTHING
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .execute(&pool)
    .await?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Lists a course's content in course order with the per-item lock flag,
/// as seen by the calling student.
pub async fn list_course_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();
    fetch_course(&pool, course_id).await?;
    require_enrollment(&pool, student_id, course_id).await?;

    let content = course_content_in_order(&pool, course_id).await?;
    let completed = completed_step_set(&pool, student_id, course_id).await?;

    let listing: Vec<LockedContentItem> = content
        .iter()
        .map(|item| LockedContentItem {
            locked: lock::is_locked(item, &content, &completed),
            item: item.clone(),
        })
        .collect();

    Ok(Json(listing))
}

/// Helper struct for the roster join.
#[derive(sqlx::FromRow)]
struct EnrollmentWithStudent {
    student_id: i64,
    username: String,
    progress_percentage: i64,
    status: crate::models::enrollment::EnrollmentStatus,
    last_activity: chrono::DateTime<chrono::Utc>,
}

/// Instructor view: every enrollment in the course with the derived
/// activity classification.
pub async fn list_students(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, course_id).await?;
    require_owner(&course, &claims)?;

    let rows = sqlx::query_as::<_, EnrollmentWithStudent>(
        r#"
        SELECT e.student_id, u.username, e.progress_percentage, e.status, e.last_activity
        FROM enrollments e
        JOIN users u ON e.student_id = u.id
        WHERE e.course_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    let now = chrono::Utc::now();
    let students: Vec<StudentOverview> = rows
        .into_iter()
        .map(|row| StudentOverview {
            classification: progress::classify_activity(
                row.last_activity,
                row.progress_percentage,
                now,
            ),
            student_id: row.student_id,
            username: row.username,
            progress_percentage: row.progress_percentage,
            status: row.status,
            last_activity: row.last_activity,
        })
        .collect();

    Ok(Json(students))
}
