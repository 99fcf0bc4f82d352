//! Wire-facing projections of stored rows, annotated with date-scoped
//! completion state. Field names follow the JSON casing clients expect.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use tempo_core::dates::storage_key;
use tempo_core::PlaylistStatus;
use tempo_store::completions::TaskCompletionRow;
use tempo_store::playlists::{DaySchedule, PlaylistRow};
use tempo_store::tasks::TaskRow;

use crate::status;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub playlist_id: String,
    pub title: String,
    /// Minutes.
    pub duration: i64,
    pub order: i64,
    /// Done for the annotated date.
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub days: DaySchedule,
    pub tasks: Vec<TaskView>,
    pub status: PlaylistStatus,
    pub is_completed: bool,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    /// The date the completion state was derived for.
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) fn assemble(
    playlist: PlaylistRow,
    tasks: Vec<TaskRow>,
    completions: &[TaskCompletionRow],
    has_playlist_completion: bool,
    date: NaiveDate,
) -> PlaylistView {
    let derived = status::derive(&tasks, completions, has_playlist_completion);
    let done_ids: HashSet<&str> = completions.iter().map(|c| c.task_id.as_str()).collect();

    let task_views = tasks
        .into_iter()
        .map(|t| {
            let done = done_ids.contains(t.id.as_str()) || t.is_completed;
            TaskView {
                id: t.id.as_str().to_string(),
                playlist_id: t.playlist_id.as_str().to_string(),
                title: t.title,
                duration: t.duration_minutes,
                order: t.position,
                is_completed: done,
                created_at: t.created_at,
                updated_at: t.updated_at,
            }
        })
        .collect();

    PlaylistView {
        id: playlist.id.as_str().to_string(),
        name: playlist.name,
        days: playlist.days,
        tasks: task_views,
        status: derived.status,
        is_completed: derived.status.is_completed(),
        completed_tasks: derived.completed_tasks,
        total_tasks: derived.total_tasks,
        date: storage_key(date),
        created_at: playlist.created_at,
        updated_at: playlist.updated_at,
    }
}
