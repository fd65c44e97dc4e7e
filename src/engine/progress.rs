// src/engine/progress.rs

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ACTIVE_WINDOW_DAYS, AT_RISK_PROGRESS_THRESHOLD};
use crate::models::course::ContentItem;
use crate::models::enrollment::StepKind;

/// Identifier of one progress step: a content item, or the quiz linked to
/// one. A content item with a linked quiz contributes two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    Content(i64),
    Quiz(i64),
}

impl StepId {
    pub fn from_parts(kind: StepKind, item_id: i64) -> Self {
        match kind {
            StepKind::Content => StepId::Content(item_id),
            StepKind::Quiz => StepId::Quiz(item_id),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            StepId::Content(_) => StepKind::Content,
            StepId::Quiz(_) => StepKind::Quiz,
        }
    }

    pub fn item_id(&self) -> i64 {
        match self {
            StepId::Content(id) | StepId::Quiz(id) => *id,
        }
    }
}

/// Result of a progress recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub percentage: i64,
    pub should_complete: bool,
}

/// Builds the full step inventory of a course from its ordered content.
/// Each item counts once; each distinct linked quiz counts once more.
pub fn course_steps(items: &[ContentItem]) -> Vec<StepId> {
    let mut steps = Vec::with_capacity(items.len());
    let mut seen_quizzes = HashSet::new();

    for item in items {
        steps.push(StepId::Content(item.id));
        if let Some(quiz_id) = item.quiz_id {
            if seen_quizzes.insert(quiz_id) {
                steps.push(StepId::Quiz(quiz_id));
            }
        }
    }

    steps
}

/// Recomputes the progress percentage from the authoritative completed-set.
///
/// Pure function of (steps, completed): recomputing with an unchanged set
/// yields the same percentage, so duplicate completion events cannot double
/// count. A course with no steps sits at 0% and never completes.
pub fn recompute(steps: &[StepId], completed: &HashSet<StepId>) -> ProgressSummary {
    if steps.is_empty() {
        return ProgressSummary {
            percentage: 0,
            should_complete: false,
        };
    }

    let done = steps.iter().filter(|step| completed.contains(step)).count();
    let percentage =
        (((done * 100) as f64 / steps.len() as f64).round() as i64).min(100);

    ProgressSummary {
        percentage,
        should_complete: percentage == 100,
    }
}

/// Derived engagement bucket for a student's enrollment. Computed at read
/// time for instructor dashboards, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityClass {
    Active,
    AtRisk,
    Inactive,
}

/// Classifies an enrollment by recency and progress: recently active
/// students are `Active`; idle ones are `AtRisk` while their progress is
/// still low, `Inactive` otherwise.
pub fn classify_activity(
    last_activity: DateTime<Utc>,
    progress_percentage: i64,
    now: DateTime<Utc>,
) -> ActivityClass {
    if now - last_activity <= Duration::days(ACTIVE_WINDOW_DAYS) {
        ActivityClass::Active
    } else if progress_percentage < AT_RISK_PROGRESS_THRESHOLD {
        ActivityClass::AtRisk
    } else {
        ActivityClass::Inactive
    }
}
