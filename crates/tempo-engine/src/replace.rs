//! Diffing for full-replacement task updates.
//!
//! The client sends the complete desired task list. Entries carrying the id
//! of a persisted task become updates; entries with no id, an unknown id,
//! or a client-side placeholder id become creates; persisted tasks absent
//! from the desired list are deleted.

use std::collections::HashSet;

use tempo_core::ids::{TaskId, PLACEHOLDER_PREFIX};
use tempo_store::tasks::{NewTask, TaskDiff, TaskRow, TaskUpdate};

use crate::engine::DesiredTask;

pub(crate) fn diff_tasks(current: &[TaskRow], desired: &[DesiredTask]) -> TaskDiff {
    let existing: HashSet<&str> = current.iter().map(|t| t.id.as_str()).collect();

    let mut diff = TaskDiff::default();
    let mut kept: HashSet<&str> = HashSet::new();

    for task in desired {
        match task.id.as_deref() {
            Some(id) if !id.starts_with(PLACEHOLDER_PREFIX) && existing.contains(id) => {
                kept.insert(id);
                diff.updates.push(TaskUpdate {
                    id: TaskId::from_raw(id),
                    title: task.title.clone(),
                    duration_minutes: task.duration_minutes,
                    position: task.position,
                });
            }
            _ => diff.creates.push(NewTask {
                title: task.title.clone(),
                duration_minutes: task.duration_minutes,
                position: task.position,
            }),
        }
    }

    diff.delete_ids = current
        .iter()
        .filter(|t| !kept.contains(t.id.as_str()))
        .map(|t| t.id.clone())
        .collect();

    diff
}
