// src/engine/lock.rs

use std::collections::HashSet;

use crate::engine::progress::StepId;
use crate::models::course::{ContentItem, ContentType};

/// Decides whether `item` is currently locked for a student, given the
/// course's content in total (module order, item order) order and the
/// student's completed-set.
///
/// The first item is never locked. A quiz placeholder item is gated on its
/// linked video's completion, which may sit anywhere earlier in the course;
/// every other item is gated on its immediate predecessor. Purely derived
/// at read time: two callers with the same completed-set always agree.
pub fn is_locked(
    item: &ContentItem,
    ordered_content: &[ContentItem],
    completed: &HashSet<StepId>,
) -> bool {
    let Some(position) = ordered_content.iter().position(|c| c.id == item.id) else {
        // Not part of this course's inventory.
        return true;
    };

    if position == 0 {
        return false;
    }

    if item.content_type == ContentType::Quiz {
        if let Some(quiz_id) = item.quiz_id {
            if let Some(video) = linked_video(item.id, quiz_id, ordered_content) {
                return !completed.contains(&StepId::Content(video.id));
            }
        }
    }

    let previous = &ordered_content[position - 1];
    !completed.contains(&StepId::Content(previous.id))
}

/// The ids of every locked item, for content-listing projections.
pub fn locked_content_ids(
    ordered_content: &[ContentItem],
    completed: &HashSet<StepId>,
) -> HashSet<i64> {
    ordered_content
        .iter()
        .filter(|item| is_locked(item, ordered_content, completed))
        .map(|item| item.id)
        .collect()
}

/// Finds the video item a quiz placeholder is chained to: the video sharing
/// its quiz reference. The video need not be the placeholder's immediate
/// list predecessor.
fn linked_video<'a>(
    quiz_item_id: i64,
    quiz_id: i64,
    ordered_content: &'a [ContentItem],
) -> Option<&'a ContentItem> {
    ordered_content.iter().find(|c| {
        c.id != quiz_item_id && c.content_type == ContentType::Video && c.quiz_id == Some(quiz_id)
    })
}
