//! Pure status derivation. No storage access; callers hand in the rows.
//!
//! The rules, in priority order:
//! 1. An explicit playlist completion record for the date is authoritative:
//!    the playlist is Completed even if individual tasks are not.
//! 2. Otherwise a playlist with at least one task is Completed when every
//!    task is done, InProgress when some are, NotStarted when none are.
//! 3. A zero-task playlist is never Completed by rule 2; only an explicit
//!    record can complete it.
//!
//! A task counts as done for a date when it has a completion row for that
//! date, or when its legacy stored flag is set. The legacy flag is a
//! read-only fallback for rows that predate per-date tracking.

use std::collections::HashSet;

use tempo_core::PlaylistStatus;
use tempo_store::completions::TaskCompletionRow;
use tempo_store::tasks::TaskRow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedStatus {
    pub status: PlaylistStatus,
    pub completed_tasks: usize,
    pub total_tasks: usize,
}

pub fn task_is_done(task: &TaskRow, done_ids: &HashSet<&str>) -> bool {
    done_ids.contains(task.id.as_str()) || task.is_completed
}

pub fn derive(
    tasks: &[TaskRow],
    completions: &[TaskCompletionRow],
    has_playlist_completion: bool,
) -> DerivedStatus {
    let done_ids: HashSet<&str> = completions.iter().map(|c| c.task_id.as_str()).collect();
    let completed_tasks = tasks.iter().filter(|t| task_is_done(t, &done_ids)).count();
    let total_tasks = tasks.len();

    let status = if has_playlist_completion {
        PlaylistStatus::Completed
    } else if total_tasks > 0 && completed_tasks == total_tasks {
        PlaylistStatus::Completed
    } else if completed_tasks > 0 {
        PlaylistStatus::InProgress
    } else {
        PlaylistStatus::NotStarted
    };

    DerivedStatus {
        status,
        completed_tasks,
        total_tasks,
    }
}
