// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Enrollment lifecycle state. `Completed` iff progress reached 100%
/// or the course was force-completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "enrollment_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
}

/// Discriminant of a progress step: a content item itself, or the
/// separately-completable quiz linked to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "step_kind", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Content,
    Quiz,
}

/// Represents the 'enrollments' table in the database.
///
/// `progress_percentage` is always recomputed from progress_records;
/// it only moves backwards on an explicit reset.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub status: EnrollmentStatus,
    pub progress_percentage: i64,
    pub last_activity: chrono::DateTime<chrono::Utc>,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'progress_records' table in the database.
/// Append-only; deleted only by an explicit course-progress reset.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub step_kind: StepKind,
    pub item_id: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Response body for the enrollment progress read.
#[derive(Debug, Serialize)]
pub struct EnrollmentProgress {
    pub percentage: i64,
    pub status: EnrollmentStatus,
}

/// One row of the instructor's student roster, with the derived
/// activity classification.
#[derive(Debug, Serialize)]
pub struct StudentOverview {
    pub student_id: i64,
    pub username: String,
    pub progress_percentage: i64,
    pub status: EnrollmentStatus,
    pub last_activity: chrono::DateTime<chrono::Utc>,
    pub classification: crate::engine::progress::ActivityClass,
}
