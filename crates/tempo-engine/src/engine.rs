use chrono::NaiveDate;
use serde::Serialize;
use tracing::instrument;

use tempo_core::dates::{today, weekday_column};
use tempo_core::ids::{PlaylistId, TaskId};
use tempo_store::completions::CompletionRepo;
use tempo_store::playlists::{DaySchedule, PlaylistRepo, PlaylistRow};
use tempo_store::stats::{PlaylistCompletionCount, StatsRepo};
use tempo_store::tasks::{NewTask, TaskRepo};
use tempo_store::Database;

use crate::error::EngineError;
use crate::replace;
use crate::views::{self, PlaylistView};

/// A task to create, without an ordering key; the engine assigns positions.
#[derive(Clone, Debug)]
pub struct TaskSpec {
    pub title: String,
    pub duration_minutes: i64,
}

/// One entry of the complete desired task list in a replacement update.
#[derive(Clone, Debug)]
pub struct DesiredTask {
    /// Persisted task id, or None / a client placeholder for a new task.
    pub id: Option<String>,
    pub title: String,
    pub duration_minutes: i64,
    pub position: i64,
}

#[derive(Clone, Debug)]
pub struct CreatePlaylist {
    pub name: String,
    pub days: DaySchedule,
    pub tasks: Vec<TaskSpec>,
}

#[derive(Clone, Debug)]
pub struct UpdatePlaylist {
    pub name: String,
    pub days: DaySchedule,
    pub tasks: Vec<DesiredTask>,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub deleted_task_completions: usize,
    pub deleted_playlist_completions: usize,
}

/// Service facade over the repos. All reads are annotated with a date
/// (defaulting to today) so completion state is always date-scoped.
pub struct PlaylistEngine {
    playlists: PlaylistRepo,
    tasks: TaskRepo,
    completions: CompletionRepo,
    stats: StatsRepo,
}

impl PlaylistEngine {
    pub fn new(db: Database) -> Self {
        Self {
            playlists: PlaylistRepo::new(db.clone()),
            tasks: TaskRepo::new(db.clone()),
            completions: CompletionRepo::new(db.clone()),
            stats: StatsRepo::new(db),
        }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_playlist(&self, input: CreatePlaylist) -> Result<PlaylistView, EngineError> {
        let name = validate_name(&input.name)?;
        validate_days(&input.days)?;
        let specs = validate_task_specs(&input.tasks)?;

        let new_tasks: Vec<NewTask> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| NewTask {
                title: spec.title.clone(),
                duration_minutes: spec.duration_minutes,
                position: i as i64 + 1,
            })
            .collect();

        let (playlist, _) = self
            .playlists
            .create_with_tasks(&name, &input.days, &new_tasks)?;
        self.view_for(playlist, today())
    }

    /// All playlists, most recently updated first, completion state scoped
    /// to the given date (today when absent).
    #[instrument(skip(self))]
    pub fn list_playlists(&self, date: Option<NaiveDate>) -> Result<Vec<PlaylistView>, EngineError> {
        let date = date.unwrap_or_else(today);
        self.playlists
            .list_all()?
            .into_iter()
            .map(|p| self.view_for(p, date))
            .collect()
    }

    /// Playlists scheduled on the date's weekday.
    #[instrument(skip(self))]
    pub fn playlists_active_on(&self, date: NaiveDate) -> Result<Vec<PlaylistView>, EngineError> {
        self.playlists
            .list_for_weekday(weekday_column(date))?
            .into_iter()
            .map(|p| self.view_for(p, date))
            .collect()
    }

    #[instrument(skip(self), fields(playlist_id = %id))]
    pub fn get_playlist(
        &self,
        id: &PlaylistId,
        date: Option<NaiveDate>,
    ) -> Result<PlaylistView, EngineError> {
        let date = date.unwrap_or_else(today);
        let playlist = self.playlists.get(id)?;
        self.view_for(playlist, date)
    }

    /// Full-replacement update: the input's task list is the complete
    /// desired state. Completion rows for kept tasks survive; rows for
    /// deleted tasks cascade away.
    #[instrument(skip(self, input), fields(playlist_id = %id))]
    pub fn update_playlist(
        &self,
        id: &PlaylistId,
        input: UpdatePlaylist,
    ) -> Result<PlaylistView, EngineError> {
        let name = validate_name(&input.name)?;
        validate_days(&input.days)?;
        for task in &input.tasks {
            validate_task(&task.title, task.duration_minutes)?;
        }

        // Existence check up front so a missing playlist is NotFound, not
        // an empty diff.
        self.playlists.get(id)?;
        let current = self.playlists.tasks(id)?;
        let diff = replace::diff_tasks(&current, &input.tasks);
        self.tasks.apply_replacement(id, &name, &input.days, &diff)?;

        self.get_playlist(id, None)
    }

    #[instrument(skip(self), fields(playlist_id = %id))]
    pub fn delete_playlist(&self, id: &PlaylistId) -> Result<(), EngineError> {
        self.playlists.delete(id)?;
        Ok(())
    }

    /// Toggle a task's done state for a date. Marking the last undone task
    /// also records a playlist completion for that date; unmarking never
    /// removes one.
    #[instrument(skip(self), fields(playlist_id = %playlist_id, task_id = %task_id, completed))]
    pub fn set_task_completion(
        &self,
        playlist_id: &PlaylistId,
        task_id: &TaskId,
        date: NaiveDate,
        completed: bool,
    ) -> Result<PlaylistView, EngineError> {
        if completed {
            self.completions.mark_task(playlist_id, task_id, date)?;
        } else {
            self.completions.unmark_task(playlist_id, task_id, date)?;
        }
        self.get_playlist(playlist_id, Some(date))
    }

    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    pub fn complete_playlist(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<PlaylistView, EngineError> {
        self.playlists.get(playlist_id)?;
        self.completions.mark_playlist(playlist_id, date)?;
        self.get_playlist(playlist_id, Some(date))
    }

    /// Remove the playlist completion record for a date. Returns how many
    /// rows were deleted; zero is success.
    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    pub fn uncomplete_playlist(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<(usize, PlaylistView), EngineError> {
        self.playlists.get(playlist_id)?;
        let deleted = self.completions.unmark_playlist(playlist_id, date)?;
        let view = self.get_playlist(playlist_id, Some(date))?;
        Ok((deleted, view))
    }

    /// Wipe a playlist's completion state for one date.
    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    pub fn reset_for_date(
        &self,
        playlist_id: &PlaylistId,
        date: NaiveDate,
    ) -> Result<ResetOutcome, EngineError> {
        let (deleted_task_completions, deleted_playlist_completions) =
            self.completions.reset_for_date(playlist_id, date)?;
        Ok(ResetOutcome {
            deleted_task_completions,
            deleted_playlist_completions,
        })
    }

    /// Delete every playlist, task, and completion record.
    #[instrument(skip(self))]
    pub fn reset_all(&self) -> Result<(), EngineError> {
        self.playlists.delete_all()?;
        Ok(())
    }

    /// Append tasks after the playlist's current highest position.
    #[instrument(skip(self, specs), fields(playlist_id = %playlist_id, task_count = specs.len()))]
    pub fn append_tasks(
        &self,
        playlist_id: &PlaylistId,
        specs: Vec<TaskSpec>,
    ) -> Result<PlaylistView, EngineError> {
        if specs.is_empty() {
            return Err(EngineError::Validation("tasks must not be empty".into()));
        }
        let specs = validate_task_specs(&specs)?;
        let pairs: Vec<(String, i64)> = specs
            .iter()
            .map(|s| (s.title.clone(), s.duration_minutes))
            .collect();
        self.tasks.append(playlist_id, &pairs)?;
        self.get_playlist(playlist_id, None)
    }

    /// Per-playlist completion counts over an inclusive date range,
    /// most-completed first, zero-count playlists excluded.
    #[instrument(skip(self))]
    pub fn completion_stats(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PlaylistCompletionCount>, EngineError> {
        if start > end {
            return Err(EngineError::Validation(
                "startDate must not be after endDate".into(),
            ));
        }
        Ok(self.stats.completion_counts(start, end)?)
    }

    fn view_for(&self, playlist: PlaylistRow, date: NaiveDate) -> Result<PlaylistView, EngineError> {
        let tasks = self.playlists.tasks(&playlist.id)?;
        let completions = self
            .completions
            .task_completions_for_playlist(&playlist.id, date)?;
        let has_record = !self
            .completions
            .playlist_completions(&playlist.id, date)?
            .is_empty();
        Ok(views::assemble(playlist, tasks, &completions, has_record, date))
    }
}

fn validate_name(name: &str) -> Result<String, EngineError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation("name is required".into()));
    }
    Ok(trimmed.to_string())
}

fn validate_days(days: &DaySchedule) -> Result<(), EngineError> {
    if !days.any_selected() {
        return Err(EngineError::Validation(
            "at least one day must be selected".into(),
        ));
    }
    Ok(())
}

fn validate_task(title: &str, duration_minutes: i64) -> Result<(), EngineError> {
    if title.trim().is_empty() {
        return Err(EngineError::Validation("task title is required".into()));
    }
    if duration_minutes < 1 {
        return Err(EngineError::Validation(
            "task duration must be a positive number of minutes".into(),
        ));
    }
    Ok(())
}

fn validate_task_specs(specs: &[TaskSpec]) -> Result<Vec<TaskSpec>, EngineError> {
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        validate_task(&spec.title, spec.duration_minutes)?;
        out.push(TaskSpec {
            title: spec.title.trim().to_string(),
            duration_minutes: spec.duration_minutes,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_core::dates::normalize_date;
    use tempo_core::PlaylistStatus;

    fn date(s: &str) -> NaiveDate {
        normalize_date(s).unwrap()
    }

    fn weekday_schedule() -> DaySchedule {
        DaySchedule {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            ..Default::default()
        }
    }

    fn spec(title: &str, minutes: i64) -> TaskSpec {
        TaskSpec {
            title: title.to_string(),
            duration_minutes: minutes,
        }
    }

    fn morning_routine(engine: &PlaylistEngine) -> PlaylistView {
        engine
            .create_playlist(CreatePlaylist {
                name: "Morning Routine".into(),
                days: weekday_schedule(),
                tasks: vec![
                    spec("Meditation", 10),
                    spec("Exercise", 30),
                    spec("Reading", 20),
                ],
            })
            .unwrap()
    }

    fn engine() -> (Database, PlaylistEngine) {
        let db = Database::in_memory().unwrap();
        let engine = PlaylistEngine::new(db.clone());
        (db, engine)
    }

    #[test]
    fn create_assigns_sequential_positions() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);

        assert_eq!(view.status, PlaylistStatus::NotStarted);
        assert_eq!(view.total_tasks, 3);
        let orders: Vec<i64> = view.tasks.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(view.tasks[0].title, "Meditation");
    }

    #[test]
    fn create_rejects_bad_input() {
        let (_db, engine) = engine();

        let err = engine.create_playlist(CreatePlaylist {
            name: "  ".into(),
            days: weekday_schedule(),
            tasks: vec![],
        });
        assert!(matches!(err, Err(EngineError::Validation(_))));

        let err = engine.create_playlist(CreatePlaylist {
            name: "p".into(),
            days: DaySchedule::default(),
            tasks: vec![],
        });
        assert!(matches!(err, Err(EngineError::Validation(_))));

        let err = engine.create_playlist(CreatePlaylist {
            name: "p".into(),
            days: weekday_schedule(),
            tasks: vec![spec("x", 0)],
        });
        assert!(matches!(err, Err(EngineError::Validation(_))));

        let err = engine.create_playlist(CreatePlaylist {
            name: "p".into(),
            days: weekday_schedule(),
            tasks: vec![spec("", 10)],
        });
        assert!(matches!(err, Err(EngineError::Validation(_))));
    }

    #[test]
    fn toggling_tasks_walks_through_statuses() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id.clone());
        let d = date("2024-01-01");
        let task_ids: Vec<TaskId> = view
            .tasks
            .iter()
            .map(|t| TaskId::from_raw(t.id.clone()))
            .collect();

        let view = engine
            .set_task_completion(&id, &task_ids[0], d, true)
            .unwrap();
        assert_eq!(view.status, PlaylistStatus::InProgress);
        assert_eq!(view.completed_tasks, 1);

        let view = engine
            .set_task_completion(&id, &task_ids[1], d, true)
            .unwrap();
        assert_eq!(view.status, PlaylistStatus::InProgress);
        assert_eq!(view.completed_tasks, 2);

        let view = engine
            .set_task_completion(&id, &task_ids[2], d, true)
            .unwrap();
        assert_eq!(view.status, PlaylistStatus::Completed);
        assert!(view.is_completed);
        assert_eq!(view.completed_tasks, 3);
    }

    #[test]
    fn completing_all_tasks_records_exactly_one_playlist_completion() {
        let (db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id.clone());
        let d = date("2024-01-01");

        for task in &view.tasks {
            engine
                .set_task_completion(&id, &TaskId::from_raw(task.id.clone()), d, true)
                .unwrap();
        }
        // A second pass must not add more records.
        for task in &view.tasks {
            engine
                .set_task_completion(&id, &TaskId::from_raw(task.id.clone()), d, true)
                .unwrap();
        }

        let records = CompletionRepo::new(db).playlist_completions(&id, d).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn completion_state_is_per_date() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id.clone());
        let task_id = TaskId::from_raw(view.tasks[0].id.clone());

        engine
            .set_task_completion(&id, &task_id, date("2024-01-01"), true)
            .unwrap();

        let other_day = engine.get_playlist(&id, Some(date("2024-01-02"))).unwrap();
        assert_eq!(other_day.status, PlaylistStatus::NotStarted);
        assert!(!other_day.tasks[0].is_completed);
    }

    #[test]
    fn toggle_rejects_task_from_another_playlist() {
        let (_db, engine) = engine();
        let a = morning_routine(&engine);
        let b = engine
            .create_playlist(CreatePlaylist {
                name: "Evening".into(),
                days: weekday_schedule(),
                tasks: vec![spec("Stretch", 5)],
            })
            .unwrap();

        let result = engine.set_task_completion(
            &PlaylistId::from_raw(b.id),
            &TaskId::from_raw(a.tasks[0].id.clone()),
            date("2024-01-01"),
            true,
        );
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn explicit_playlist_completion_overrides_task_state() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id);
        let d = date("2024-01-01");

        let view = engine.complete_playlist(&id, d).unwrap();
        assert_eq!(view.status, PlaylistStatus::Completed);
        // Individual tasks are still undone.
        assert_eq!(view.completed_tasks, 0);

        let (deleted, view) = engine.uncomplete_playlist(&id, d).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(view.status, PlaylistStatus::NotStarted);
    }

    #[test]
    fn zero_task_playlist_completes_only_explicitly() {
        let (_db, engine) = engine();
        let view = engine
            .create_playlist(CreatePlaylist {
                name: "Empty".into(),
                days: weekday_schedule(),
                tasks: vec![],
            })
            .unwrap();
        assert_eq!(view.status, PlaylistStatus::NotStarted);

        let id = PlaylistId::from_raw(view.id);
        let d = date("2024-01-01");
        let view = engine.complete_playlist(&id, d).unwrap();
        assert_eq!(view.status, PlaylistStatus::Completed);
    }

    #[test]
    fn reset_clears_one_date() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id.clone());
        let d = date("2024-01-01");

        for task in &view.tasks {
            engine
                .set_task_completion(&id, &TaskId::from_raw(task.id.clone()), d, true)
                .unwrap();
        }

        let outcome = engine.reset_for_date(&id, d).unwrap();
        assert_eq!(outcome.deleted_task_completions, 3);
        assert_eq!(outcome.deleted_playlist_completions, 1);

        let view = engine.get_playlist(&id, Some(d)).unwrap();
        assert_eq!(view.status, PlaylistStatus::NotStarted);
        assert_eq!(view.completed_tasks, 0);
    }

    #[test]
    fn replacement_keeps_completions_of_surviving_tasks() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id.clone());
        let d = date("2024-01-01");

        // Complete the first task, then replace: keep it (renamed), drop
        // the second, add a new one via placeholder id.
        engine
            .set_task_completion(&id, &TaskId::from_raw(view.tasks[0].id.clone()), d, true)
            .unwrap();

        let updated = engine
            .update_playlist(
                &id,
                UpdatePlaylist {
                    name: "Morning Routine v2".into(),
                    days: weekday_schedule(),
                    tasks: vec![
                        DesiredTask {
                            id: Some(view.tasks[0].id.clone()),
                            title: "Morning Meditation".into(),
                            duration_minutes: 15,
                            position: 1,
                        },
                        DesiredTask {
                            id: Some("temp-1".into()),
                            title: "Journaling".into(),
                            duration_minutes: 10,
                            position: 2,
                        },
                        DesiredTask {
                            id: None,
                            title: "Stretching".into(),
                            duration_minutes: 5,
                            position: 3,
                        },
                    ],
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Morning Routine v2");
        assert_eq!(updated.total_tasks, 3);
        assert_eq!(updated.tasks[0].title, "Morning Meditation");
        assert_eq!(updated.tasks[0].duration, 15);

        let view = engine.get_playlist(&id, Some(d)).unwrap();
        assert!(view.tasks[0].is_completed);
        assert_eq!(view.completed_tasks, 1);
        assert_eq!(view.status, PlaylistStatus::InProgress);
    }

    #[test]
    fn scheduling_selector_uses_weekday_columns() {
        let (_db, engine) = engine();
        morning_routine(&engine);
        engine
            .create_playlist(CreatePlaylist {
                name: "Weekend".into(),
                days: DaySchedule {
                    saturday: true,
                    sunday: true,
                    ..Default::default()
                },
                tasks: vec![spec("Hike", 60)],
            })
            .unwrap();

        // 2024-01-01 was a Monday, 2024-01-06 a Saturday.
        let monday = engine.playlists_active_on(date("2024-01-01")).unwrap();
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].name, "Morning Routine");

        let saturday = engine.playlists_active_on(date("2024-01-06")).unwrap();
        assert_eq!(saturday.len(), 1);
        assert_eq!(saturday[0].name, "Weekend");
    }

    #[test]
    fn append_tasks_extends_the_list() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id);

        let view = engine
            .append_tasks(&id, vec![spec("Journaling", 10)])
            .unwrap();
        assert_eq!(view.total_tasks, 4);
        assert_eq!(view.tasks[3].title, "Journaling");
        assert_eq!(view.tasks[3].order, 4);

        let err = engine.append_tasks(&id, vec![]);
        assert!(matches!(err, Err(EngineError::Validation(_))));
    }

    #[test]
    fn stats_require_ordered_range() {
        let (_db, engine) = engine();
        let view = morning_routine(&engine);
        let id = PlaylistId::from_raw(view.id);

        engine.complete_playlist(&id, date("2024-01-01")).unwrap();
        engine.complete_playlist(&id, date("2024-01-03")).unwrap();

        let counts = engine
            .completion_stats(date("2024-01-01"), date("2024-01-07"))
            .unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 2);

        let err = engine.completion_stats(date("2024-01-07"), date("2024-01-01"));
        assert!(matches!(err, Err(EngineError::Validation(_))));
    }

    #[test]
    fn reset_all_empties_everything() {
        let (_db, engine) = engine();
        morning_routine(&engine);
        engine.reset_all().unwrap();
        assert!(engine.list_playlists(None).unwrap().is_empty());
    }

    #[test]
    fn missing_playlist_is_not_found() {
        let (_db, engine) = engine();
        let missing = PlaylistId::from_raw("pl_missing");
        assert!(matches!(
            engine.get_playlist(&missing, None),
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            engine.delete_playlist(&missing),
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            engine.complete_playlist(&missing, date("2024-01-01")),
            Err(EngineError::NotFound(_))
        ));
    }
}
