use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tempo_core::dates::WEEKDAY_COLUMNS;
use tempo_core::ids::{PlaylistId, TaskId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;
use crate::tasks::{row_to_task, NewTask, TaskRow, TASK_COLUMNS};

/// Which weekdays a playlist is scheduled on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(default)]
    pub monday: bool,
    #[serde(default)]
    pub tuesday: bool,
    #[serde(default)]
    pub wednesday: bool,
    #[serde(default)]
    pub thursday: bool,
    #[serde(default)]
    pub friday: bool,
    #[serde(default)]
    pub saturday: bool,
    #[serde(default)]
    pub sunday: bool,
}

impl DaySchedule {
    pub fn any_selected(&self) -> bool {
        self.monday
            || self.tuesday
            || self.wednesday
            || self.thursday
            || self.friday
            || self.saturday
            || self.sunday
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaylistRow {
    pub id: PlaylistId,
    pub name: String,
    #[serde(flatten)]
    pub days: DaySchedule,
    pub created_at: String,
    pub updated_at: String,
}

const PLAYLIST_COLUMNS: &str =
    "id, name, monday, tuesday, wednesday, thursday, friday, saturday, sunday, created_at, updated_at";

pub struct PlaylistRepo {
    db: Database,
}

impl PlaylistRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a playlist together with its initial tasks, atomically.
    #[instrument(skip(self, tasks), fields(name, task_count = tasks.len()))]
    pub fn create_with_tasks(
        &self,
        name: &str,
        days: &DaySchedule,
        tasks: &[NewTask],
    ) -> Result<(PlaylistRow, Vec<TaskRow>), StoreError> {
        let id = PlaylistId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO playlists (id, name, monday, tuesday, wednesday, thursday, friday, saturday, sunday, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    id.as_str(),
                    name,
                    days.monday,
                    days.tuesday,
                    days.wednesday,
                    days.thursday,
                    days.friday,
                    days.saturday,
                    days.sunday,
                    now,
                    now,
                ],
            )?;

            let mut created = Vec::with_capacity(tasks.len());
            for task in tasks {
                let task_id = TaskId::new();
                tx.execute(
                    "INSERT INTO tasks (id, playlist_id, title, duration_minutes, position, is_completed, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
                    rusqlite::params![
                        task_id.as_str(),
                        id.as_str(),
                        task.title,
                        task.duration_minutes,
                        task.position,
                        now,
                        now,
                    ],
                )?;
                created.push(TaskRow {
                    id: task_id,
                    playlist_id: id.clone(),
                    title: task.title.clone(),
                    duration_minutes: task.duration_minutes,
                    position: task.position,
                    is_completed: false,
                    created_at: now.clone(),
                    updated_at: now.clone(),
                });
            }
            created.sort_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then_with(|| a.id.as_str().cmp(b.id.as_str()))
            });

            Ok((
                PlaylistRow {
                    id: id.clone(),
                    name: name.to_string(),
                    days: *days,
                    created_at: now.clone(),
                    updated_at: now,
                },
                created,
            ))
        })
    }

    /// Get a playlist by ID.
    #[instrument(skip(self), fields(playlist_id = %id))]
    pub fn get(&self, id: &PlaylistId) -> Result<PlaylistRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE id = ?1"
            ))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_playlist(row),
                None => Err(StoreError::NotFound(format!("playlist {id}"))),
            }
        })
    }

    /// List all playlists, most recently updated first.
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<PlaylistRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAYLIST_COLUMNS} FROM playlists ORDER BY updated_at DESC, id DESC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_playlist(row)?);
            }
            Ok(results)
        })
    }

    /// List playlists scheduled on the given weekday column.
    /// The column name must come from the fixed weekday table; anything else
    /// is rejected before it reaches the SQL text.
    #[instrument(skip(self))]
    pub fn list_for_weekday(&self, column: &str) -> Result<Vec<PlaylistRow>, StoreError> {
        let column = WEEKDAY_COLUMNS
            .iter()
            .find(|c| **c == column)
            .ok_or_else(|| StoreError::Database(format!("unknown weekday column: {column}")))?;

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE {column} = 1 ORDER BY updated_at DESC, id DESC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_playlist(row)?);
            }
            Ok(results)
        })
    }

    /// Tasks for a playlist, position ascending, insertion order on ties.
    #[instrument(skip(self), fields(playlist_id = %id))]
    pub fn tasks(&self, id: &PlaylistId) -> Result<Vec<TaskRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE playlist_id = ?1 ORDER BY position ASC, id ASC"
            ))?;
            let mut rows = stmt.query([id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_task(row)?);
            }
            Ok(results)
        })
    }

    /// Delete a playlist. Tasks and completion records cascade.
    #[instrument(skip(self), fields(playlist_id = %id))]
    pub fn delete(&self, id: &PlaylistId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM playlists WHERE id = ?1", [id.as_str()])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("playlist {id}")));
            }
            Ok(())
        })
    }

    /// Delete every playlist and task in the store. Completions cascade.
    #[instrument(skip(self))]
    pub fn delete_all(&self) -> Result<(), StoreError> {
        self.db.with_tx(|tx| {
            tx.execute("DELETE FROM tasks", [])?;
            tx.execute("DELETE FROM playlists", [])?;
            Ok(())
        })
    }
}

pub(crate) fn row_to_playlist(row: &rusqlite::Row<'_>) -> Result<PlaylistRow, StoreError> {
    Ok(PlaylistRow {
        id: PlaylistId::from_raw(row_helpers::get::<String>(row, 0, "playlists", "id")?),
        name: row_helpers::get(row, 1, "playlists", "name")?,
        days: DaySchedule {
            monday: row_helpers::get(row, 2, "playlists", "monday")?,
            tuesday: row_helpers::get(row, 3, "playlists", "tuesday")?,
            wednesday: row_helpers::get(row, 4, "playlists", "wednesday")?,
            thursday: row_helpers::get(row, 5, "playlists", "thursday")?,
            friday: row_helpers::get(row, 6, "playlists", "friday")?,
            saturday: row_helpers::get(row, 7, "playlists", "saturday")?,
            sunday: row_helpers::get(row, 8, "playlists", "sunday")?,
        },
        created_at: row_helpers::get(row, 9, "playlists", "created_at")?,
        updated_at: row_helpers::get(row, 10, "playlists", "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekdays() -> DaySchedule {
        DaySchedule {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            ..Default::default()
        }
    }

    fn task(title: &str, position: i64) -> NewTask {
        NewTask {
            title: title.to_string(),
            duration_minutes: 10,
            position,
        }
    }

    #[test]
    fn create_and_get() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db);
        let (playlist, tasks) = repo
            .create_with_tasks("Morning Routine", &weekdays(), &[task("Meditation", 1)])
            .unwrap();
        assert!(playlist.id.as_str().starts_with("pl_"));
        assert_eq!(tasks.len(), 1);

        let fetched = repo.get(&playlist.id).unwrap();
        assert_eq!(fetched.name, "Morning Routine");
        assert!(fetched.days.monday);
        assert!(!fetched.days.saturday);
    }

    #[test]
    fn get_nonexistent_fails() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db);
        let result = repo.get(&PlaylistId::from_raw("pl_missing"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn tasks_ordered_by_position() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db);
        let (playlist, _) = repo
            .create_with_tasks(
                "p",
                &weekdays(),
                &[task("third", 3), task("first", 1), task("second", 2)],
            )
            .unwrap();

        let tasks = repo.tasks(&playlist.id).unwrap();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn list_for_weekday_filters() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db);
        repo.create_with_tasks("weekday", &weekdays(), &[]).unwrap();
        repo.create_with_tasks(
            "weekend",
            &DaySchedule {
                saturday: true,
                sunday: true,
                ..Default::default()
            },
            &[],
        )
        .unwrap();

        let monday = repo.list_for_weekday("monday").unwrap();
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].name, "weekday");

        let sunday = repo.list_for_weekday("sunday").unwrap();
        assert_eq!(sunday.len(), 1);
        assert_eq!(sunday[0].name, "weekend");
    }

    #[test]
    fn list_for_weekday_rejects_unknown_column() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db);
        let result = repo.list_for_weekday("id; DROP TABLE playlists");
        assert!(result.is_err());
    }

    #[test]
    fn delete_cascades_to_tasks() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db.clone());
        let (playlist, _) = repo
            .create_with_tasks("p", &weekdays(), &[task("a", 1), task("b", 2)])
            .unwrap();

        repo.delete(&playlist.id).unwrap();
        assert!(repo.get(&playlist.id).is_err());

        let task_count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
                    .map_err(StoreError::from)
            })
            .unwrap();
        assert_eq!(task_count, 0);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db);
        let result = repo.delete(&PlaylistId::from_raw("pl_missing"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_all_empties_store() {
        let db = Database::in_memory().unwrap();
        let repo = PlaylistRepo::new(db);
        repo.create_with_tasks("a", &weekdays(), &[task("t", 1)]).unwrap();
        repo.create_with_tasks("b", &weekdays(), &[]).unwrap();

        repo.delete_all().unwrap();
        assert!(repo.list_all().unwrap().is_empty());
    }
}
