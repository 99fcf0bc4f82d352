use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tempo_core::ids::{PlaylistId, TaskId};

use crate::database::Database;
use crate::error::StoreError;
use crate::playlists::DaySchedule;
use crate::row_helpers;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: TaskId,
    pub playlist_id: PlaylistId,
    pub title: String,
    pub duration_minutes: i64,
    pub position: i64,
    /// Legacy completion flag. Consulted only as a derivation fallback;
    /// date-scoped toggles never write it.
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A task to insert.
#[derive(Clone, Debug)]
pub struct NewTask {
    pub title: String,
    pub duration_minutes: i64,
    pub position: i64,
}

/// An in-place update to an existing task.
#[derive(Clone, Debug)]
pub struct TaskUpdate {
    pub id: TaskId,
    pub title: String,
    pub duration_minutes: i64,
    pub position: i64,
}

/// Resolved difference between the persisted task set and the complete
/// desired state sent by the client.
#[derive(Clone, Debug, Default)]
pub struct TaskDiff {
    pub creates: Vec<NewTask>,
    pub updates: Vec<TaskUpdate>,
    pub delete_ids: Vec<TaskId>,
}

pub(crate) const TASK_COLUMNS: &str =
    "id, playlist_id, title, duration_minutes, position, is_completed, created_at, updated_at";

pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a task by ID.
    #[instrument(skip(self), fields(task_id = %id))]
    pub fn get(&self, id: &TaskId) -> Result<TaskRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_task(row),
                None => Err(StoreError::NotFound(format!("task {id}"))),
            }
        })
    }

    /// Append tasks after the playlist's current highest position, atomically.
    #[instrument(skip(self, tasks), fields(playlist_id = %playlist_id, task_count = tasks.len()))]
    pub fn append(
        &self,
        playlist_id: &PlaylistId,
        tasks: &[(String, i64)],
    ) -> Result<Vec<TaskRow>, StoreError> {
        let now = Utc::now().to_rfc3339();

        self.db.with_tx(|tx| {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM playlists WHERE id = ?1)",
                [playlist_id.as_str()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::NotFound(format!("playlist {playlist_id}")));
            }

            let highest: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position), 0) FROM tasks WHERE playlist_id = ?1",
                [playlist_id.as_str()],
                |row| row.get(0),
            )?;

            let mut created = Vec::with_capacity(tasks.len());
            for (offset, (title, duration_minutes)) in tasks.iter().enumerate() {
                let id = TaskId::new();
                let position = highest + 1 + offset as i64;
                tx.execute(
                    "INSERT INTO tasks (id, playlist_id, title, duration_minutes, position, is_completed, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
                    rusqlite::params![
                        id.as_str(),
                        playlist_id.as_str(),
                        title,
                        duration_minutes,
                        position,
                        now,
                        now,
                    ],
                )?;
                created.push(TaskRow {
                    id,
                    playlist_id: playlist_id.clone(),
                    title: title.clone(),
                    duration_minutes: *duration_minutes,
                    position,
                    is_completed: false,
                    created_at: now.clone(),
                    updated_at: now.clone(),
                });
            }
            Ok(created)
        })
    }

    /// Apply a full-replacement update: playlist name/schedule plus the
    /// task diff, all-or-nothing. Bumps the playlist's updated_at.
    #[instrument(skip(self, diff), fields(
        playlist_id = %playlist_id,
        creates = diff.creates.len(),
        updates = diff.updates.len(),
        deletes = diff.delete_ids.len(),
    ))]
    pub fn apply_replacement(
        &self,
        playlist_id: &PlaylistId,
        name: &str,
        days: &DaySchedule,
        diff: &TaskDiff,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        self.db.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE playlists SET name = ?1, monday = ?2, tuesday = ?3, wednesday = ?4,
                        thursday = ?5, friday = ?6, saturday = ?7, sunday = ?8, updated_at = ?9
                 WHERE id = ?10",
                rusqlite::params![
                    name,
                    days.monday,
                    days.tuesday,
                    days.wednesday,
                    days.thursday,
                    days.friday,
                    days.saturday,
                    days.sunday,
                    now,
                    playlist_id.as_str(),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("playlist {playlist_id}")));
            }

            for id in &diff.delete_ids {
                tx.execute(
                    "DELETE FROM tasks WHERE id = ?1 AND playlist_id = ?2",
                    rusqlite::params![id.as_str(), playlist_id.as_str()],
                )?;
            }

            for update in &diff.updates {
                tx.execute(
                    "UPDATE tasks SET title = ?1, duration_minutes = ?2, position = ?3, updated_at = ?4
                     WHERE id = ?5 AND playlist_id = ?6",
                    rusqlite::params![
                        update.title,
                        update.duration_minutes,
                        update.position,
                        now,
                        update.id.as_str(),
                        playlist_id.as_str(),
                    ],
                )?;
            }

            for create in &diff.creates {
                let id = TaskId::new();
                tx.execute(
                    "INSERT INTO tasks (id, playlist_id, title, duration_minutes, position, is_completed, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
                    rusqlite::params![
                        id.as_str(),
                        playlist_id.as_str(),
                        create.title,
                        create.duration_minutes,
                        create.position,
                        now,
                        now,
                    ],
                )?;
            }

            Ok(())
        })
    }
}

pub(crate) fn row_to_task(row: &rusqlite::Row<'_>) -> Result<TaskRow, StoreError> {
    Ok(TaskRow {
        id: TaskId::from_raw(row_helpers::get::<String>(row, 0, "tasks", "id")?),
        playlist_id: PlaylistId::from_raw(row_helpers::get::<String>(
            row,
            1,
            "tasks",
            "playlist_id",
        )?),
        title: row_helpers::get(row, 2, "tasks", "title")?,
        duration_minutes: row_helpers::get(row, 3, "tasks", "duration_minutes")?,
        position: row_helpers::get(row, 4, "tasks", "position")?,
        is_completed: row_helpers::get(row, 5, "tasks", "is_completed")?,
        created_at: row_helpers::get(row, 6, "tasks", "created_at")?,
        updated_at: row_helpers::get(row, 7, "tasks", "updated_at")?,
    })
}
