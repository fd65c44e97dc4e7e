// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Kind of material a content item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "content_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Video,
    Text,
    Quiz,
}

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'course_modules' table in the database.
/// Modules order a course's content into sections.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub order_index: i32,
}

/// Represents the 'content_items' table in the database.
///
/// The course-wide ordering of items is (module order, item order); that
/// concatenated order drives sequential unlocking.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub content_type: ContentType,

    /// Rich-text body for 'text' items. Sanitized before storage.
    pub body: Option<String>,

    /// Source URL for 'video' items.
    pub video_url: Option<String>,

    /// Quiz gating this item. Mandatory for videos with a follow-up check,
    /// and for 'quiz' placeholder items.
    pub quiz_id: Option<i64>,

    pub order_index: i32,
}

/// A content item as seen by an enrolled student: the stored row plus the
/// read-time lock flag. Never persisted.
#[derive(Debug, Serialize)]
pub struct LockedContentItem {
    #[serde(flatten)]
    pub item: ContentItem,
    pub locked: bool,
}

/// Course detail response: the course with its ordered modules and content.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleDetail>,
}

#[derive(Debug, Serialize)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: CourseModule,
    pub content: Vec<ContentItem>,
}

/// DTO for creating a course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// DTO for adding a module to a course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0))]
    pub order_index: i32,
}

/// DTO for adding a content item to a module.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content_type: ContentType,
    #[validate(length(max = 100_000))]
    pub body: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub video_url: Option<String>,
    pub quiz_id: Option<i64>,
    #[validate(range(min = 0))]
    pub order_index: i32,
}

fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
