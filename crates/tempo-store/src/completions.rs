use chrono::{NaiveDate, Utc};
use rusqlite::Transaction;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tempo_core::dates::{day_range, storage_key};
use tempo_core::ids::{PlaylistCompletionId, PlaylistId, TaskCompletionId, TaskId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskCompletionRow {
    pub id: TaskCompletionId,
    pub task_id: TaskId,
    pub date: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaylistCompletionRow {
    pub id: PlaylistCompletionId,
    pub playlist_id: PlaylistId,
    pub date: String,
    pub created_at: String,
}

/// Result of marking a task done for a date.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskMarkOutcome {
    /// A new completion row was written (false when one already covered
    /// the date).
    pub inserted: bool,
    /// The toggle left every task of the playlist done and a playlist
    /// completion row was written as a consequence.
    pub playlist_auto_completed: bool,
}

/// Date-scoped completion records for tasks and playlists.
///
/// All lookups and deletions match on the half-open day range, so rows
/// written by older revisions with a time component still count. Writes
/// always store the normalized date-only key.
pub struct CompletionRepo {
    db: Database,
}

impl CompletionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Mark a task done for a date. Idempotent: a second mark on the same
    /// day changes nothing. When the mark leaves every task of the playlist
    /// done and no playlist completion row covers the date, one is written
    /// in the same transaction.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, task_id = %task_id, date = %date))]
    pub fn mark_task(
        &self,
        playlist_id: &PlaylistId,
        task_id: &TaskId,
        date: NaiveDate,
    ) -> Result<TaskMarkOutcome, StoreError> {
        let (start, end) = day_range(date);
        let now = Utc::now().to_rfc3339();

        self.db.with_tx(|tx| {
            require_membership(tx, playlist_id, task_id)?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM task_completions WHERE task_id = ?1 AND date >= ?2 AND date < ?3)",
                rusqlite::params![task_id.as_str(), start, end],
                |row| row.get(0),
            )?;
            let inserted = if exists {
                false
            } else {
                tx.execute(
                    "INSERT OR IGNORE INTO task_completions (id, task_id, date, created_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![
                        TaskCompletionId::new().as_str(),
                        task_id.as_str(),
                        storage_key(date),
                        now,
                    ],
                )? > 0
            };

            // Tasks still undone for the date, via completion row or the
            // legacy flag.
            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM tasks t
                 WHERE t.playlist_id = ?1
                   AND t.is_completed = 0
                   AND NOT EXISTS(SELECT 1 FROM task_completions tc
                                  WHERE tc.task_id = t.id AND tc.date >= ?2 AND tc.date < ?3)",
                rusqlite::params![playlist_id.as_str(), start, end],
                |row| row.get(0),
            )?;

            let mut playlist_auto_completed = false;
            if remaining == 0 {
                let already: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM playlist_completions WHERE playlist_id = ?1 AND date >= ?2 AND date < ?3)",
                    rusqlite::params![playlist_id.as_str(), start, end],
                    |row| row.get(0),
                )?;
                if !already {
                    tx.execute(
                        "INSERT OR IGNORE INTO playlist_completions (id, playlist_id, date, created_at) VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![
                            PlaylistCompletionId::new().as_str(),
                            playlist_id.as_str(),
                            storage_key(date),
                            now,
                        ],
                    )?;
                    playlist_auto_completed = true;
                }
            }

            Ok(TaskMarkOutcome {
                inserted,
                playlist_auto_completed,
            })
        })
    }

    /// Delete completion rows for (task, date). Zero deletions is success.
    /// The legacy flag and any playlist completion row are left alone.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, task_id = %task_id, date = %date))]
    pub fn unmark_task(
        &self,
        playlist_id: &PlaylistId,
        task_id: &TaskId,
        date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let (start, end) = day_range(date);
        self.db.with_tx(|tx| {
            require_membership(tx, playlist_id, task_id)?;
            let deleted = tx.execute(
                "DELETE FROM task_completions WHERE task_id = ?1 AND date >= ?2 AND date < ?3",
                rusqlite::params![task_id.as_str(), start, end],
            )?;
            Ok(deleted)
        })
    }

    /// Ensure exactly one completion row exists for (playlist, date).
    #[instrument(skip(self), fields(playlist_id = %playlist_id, date = %date))]
    pub fn mark_playlist(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<PlaylistCompletionRow, StoreError> {
        let (start, end) = day_range(date);
        let now = Utc::now().to_rfc3339();

        self.db.with_tx(|tx| {
            let existing = {
                let mut stmt = tx.prepare(
                    "SELECT id, playlist_id, date, created_at FROM playlist_completions
                     WHERE playlist_id = ?1 AND date >= ?2 AND date < ?3",
                )?;
                let mut rows = stmt.query(rusqlite::params![playlist_id.as_str(), start, end])?;
                match rows.next()? {
                    Some(row) => Some(row_to_playlist_completion(row)?),
                    None => None,
                }
            };
            if let Some(row) = existing {
                return Ok(row);
            }

            let id = PlaylistCompletionId::new();
            tx.execute(
                "INSERT OR IGNORE INTO playlist_completions (id, playlist_id, date, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.as_str(), playlist_id.as_str(), storage_key(date), now],
            )?;
            Ok(PlaylistCompletionRow {
                id,
                playlist_id: playlist_id.clone(),
                date: storage_key(date),
                created_at: now,
            })
        })
    }

    /// Delete completion rows for (playlist, date). Zero deletions is success.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, date = %date))]
    pub fn unmark_playlist(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let (start, end) = day_range(date);
        self.db.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM playlist_completions WHERE playlist_id = ?1 AND date >= ?2 AND date < ?3",
                rusqlite::params![playlist_id.as_str(), start, end],
            )?;
            Ok(deleted)
        })
    }

    /// Completion rows for every task of a playlist, scoped to one day.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, date = %date))]
    pub fn task_completions_for_playlist(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<Vec<TaskCompletionRow>, StoreError> {
        let (start, end) = day_range(date);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT tc.id, tc.task_id, tc.date, tc.created_at
                 FROM task_completions tc
                 JOIN tasks t ON t.id = tc.task_id
                 WHERE t.playlist_id = ?1 AND tc.date >= ?2 AND tc.date < ?3",
            )?;
            let mut rows = stmt.query(rusqlite::params![playlist_id.as_str(), start, end])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_task_completion(row)?);
            }
            Ok(results)
        })
    }

    /// Playlist-level completion rows scoped to one day.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, date = %date))]
    pub fn playlist_completions(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<Vec<PlaylistCompletionRow>, StoreError> {
        let (start, end) = day_range(date);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, playlist_id, date, created_at FROM playlist_completions
                 WHERE playlist_id = ?1 AND date >= ?2 AND date < ?3",
            )?;
            let mut rows = stmt.query(rusqlite::params![playlist_id.as_str(), start, end])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_playlist_completion(row)?);
            }
            Ok(results)
        })
    }

    /// Atomically delete all of a playlist's task completions and playlist
    /// completions matching the date. Returns (task, playlist) deletion
    /// counts. A playlist with no tasks is rejected; a playlist with tasks
    /// but nothing to delete succeeds with zero counts.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, date = %date))]
    pub fn reset_for_date(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<(usize, usize), StoreError> {
        let (start, end) = day_range(date);

        self.db.with_tx(|tx| {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM playlists WHERE id = ?1)",
                [playlist_id.as_str()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::NotFound(format!("playlist {playlist_id}")));
            }

            let task_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM tasks WHERE playlist_id = ?1",
                [playlist_id.as_str()],
                |row| row.get(0),
            )?;
            if task_count == 0 {
                return Err(StoreError::NotFound(format!(
                    "no tasks for playlist {playlist_id}"
                )));
            }

            let deleted_tasks = tx.execute(
                "DELETE FROM task_completions
                 WHERE task_id IN (SELECT id FROM tasks WHERE playlist_id = ?1)
                   AND date >= ?2 AND date < ?3",
                rusqlite::params![playlist_id.as_str(), start, end],
            )?;

            let deleted_playlists = tx.execute(
                "DELETE FROM playlist_completions
                 WHERE playlist_id = ?1 AND date >= ?2 AND date < ?3",
                rusqlite::params![playlist_id.as_str(), start, end],
            )?;

            Ok((deleted_tasks, deleted_playlists))
        })
    }
}

/// NotFound unless the task exists and belongs to the playlist.
fn require_membership(
    tx: &Transaction<'_>,
    playlist_id: &PlaylistId,
    task_id: &TaskId,
) -> Result<(), StoreError> {
    let owner: Option<String> = tx
        .query_row(
            "SELECT playlist_id FROM tasks WHERE id = ?1",
            [task_id.as_str()],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    match owner {
        Some(owner) if owner == playlist_id.as_str() => Ok(()),
        Some(_) | None => Err(StoreError::NotFound(format!(
            "task {task_id} in playlist {playlist_id}"
        ))),
    }
}

fn row_to_task_completion(row: &rusqlite::Row<'_>) -> Result<TaskCompletionRow, StoreError> {
    Ok(TaskCompletionRow {
        id: TaskCompletionId::from_raw(row_helpers::get::<String>(
            row,
            0,
            "task_completions",
            "id",
        )?),
        task_id: TaskId::from_raw(row_helpers::get::<String>(
            row,
            1,
            "task_completions",
            "task_id",
        )?),
        date: row_helpers::get(row, 2, "task_completions", "date")?,
        created_at: row_helpers::get(row, 3, "task_completions", "created_at")?,
    })
}

fn row_to_playlist_completion(
    row: &rusqlite::Row<'_>,
) -> Result<PlaylistCompletionRow, StoreError> {
    Ok(PlaylistCompletionRow {
        id: PlaylistCompletionId::from_raw(row_helpers::get::<String>(
            row,
            0,
            "playlist_completions",
            "id",
        )?),
        playlist_id: PlaylistId::from_raw(row_helpers::get::<String>(
            row,
            1,
            "playlist_completions",
            "playlist_id",
        )?),
        date: row_helpers::get(row, 2, "playlist_completions", "date")?,
        created_at: row_helpers::get(row, 3, "playlist_completions", "created_at")?,
    })
}
