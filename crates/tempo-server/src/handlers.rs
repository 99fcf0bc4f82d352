use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tempo_core::dates::normalize_date;
use tempo_core::ids::{PlaylistId, TaskId};
use tempo_engine::{
    CreatePlaylist, DesiredTask, PlaylistView, ResetOutcome, TaskSpec, UpdatePlaylist,
};
use tempo_genai::GeneratedTask;
use tempo_store::playlists::DaySchedule;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredDateQuery {
    pub date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Deserialize)]
pub struct NewTaskDto {
    pub title: String,
    /// Minutes.
    pub duration: i64,
}

#[derive(Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    #[serde(flatten)]
    pub days: DaySchedule,
    #[serde(default)]
    pub tasks: Vec<NewTaskDto>,
}

#[derive(Deserialize)]
pub struct ReplaceTaskDto {
    pub id: Option<String>,
    pub title: String,
    pub duration: i64,
    pub order: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdatePlaylistRequest {
    pub name: String,
    #[serde(flatten)]
    pub days: DaySchedule,
    #[serde(default)]
    pub tasks: Vec<ReplaceTaskDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleTaskRequest {
    pub is_completed: bool,
    pub date: String,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub date: String,
}

#[derive(Deserialize)]
pub struct AppendTasksRequest {
    pub tasks: Vec<NewTaskDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTasksRequest {
    pub prompt: String,
    pub playlist_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsEntry {
    pub playlist_id: String,
    pub name: String,
    pub count: i64,
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    normalize_date(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn parse_date_opt(raw: &Option<String>) -> Result<Option<NaiveDate>, ApiError> {
    raw.as_deref().map(parse_date).transpose()
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .db
        .with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(tempo_store::StoreError::from)
        })
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Without a date: every playlist, completion state scoped to today. With
/// one: only playlists scheduled on that date's weekday.
pub async fn list_playlists(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<PlaylistView>>, ApiError> {
    let views = match parse_date_opt(&query.date)? {
        Some(date) => state.engine.playlists_active_on(date)?,
        None => state.engine.list_playlists(None)?,
    };
    Ok(Json(views))
}

pub async fn create_playlist(
    State(state): State<AppState>,
    Json(body): Json<CreatePlaylistRequest>,
) -> Result<(axum::http::StatusCode, Json<PlaylistView>), ApiError> {
    let view = state.engine.create_playlist(CreatePlaylist {
        name: body.name,
        days: body.days,
        tasks: body
            .tasks
            .into_iter()
            .map(|t| TaskSpec {
                title: t.title,
                duration_minutes: t.duration,
            })
            .collect(),
    })?;
    Ok((axum::http::StatusCode::CREATED, Json(view)))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<PlaylistView>, ApiError> {
    let date = parse_date_opt(&query.date)?;
    let view = state.engine.get_playlist(&PlaylistId::from_raw(id), date)?;
    Ok(Json(view))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePlaylistRequest>,
) -> Result<Json<PlaylistView>, ApiError> {
    let tasks = body
        .tasks
        .into_iter()
        .enumerate()
        .map(|(i, t)| DesiredTask {
            id: t.id,
            title: t.title,
            duration_minutes: t.duration,
            position: t.order.unwrap_or(i as i64 + 1),
        })
        .collect();

    let view = state.engine.update_playlist(
        &PlaylistId::from_raw(id),
        UpdatePlaylist {
            name: body.name,
            days: body.days,
            tasks,
        },
    )?;
    Ok(Json(view))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.engine.delete_playlist(&PlaylistId::from_raw(id))?;
    Ok(Json(json!({ "success": true })))
}

pub async fn complete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<PlaylistView>, ApiError> {
    let date = parse_date(&body.date)?;
    let view = state
        .engine
        .complete_playlist(&PlaylistId::from_raw(id), date)?;
    Ok(Json(view))
}

pub async fn uncomplete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<Value>, ApiError> {
    let date = parse_date(&body.date)?;
    let (deleted, view) = state
        .engine
        .uncomplete_playlist(&PlaylistId::from_raw(id), date)?;
    Ok(Json(json!({ "deletedCount": deleted, "playlist": view })))
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
    Json(body): Json<ToggleTaskRequest>,
) -> Result<Json<PlaylistView>, ApiError> {
    let date = parse_date(&body.date)?;
    let view = state.engine.set_task_completion(
        &PlaylistId::from_raw(id),
        &TaskId::from_raw(task_id),
        date,
        body.is_completed,
    )?;
    Ok(Json(view))
}

pub async fn append_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AppendTasksRequest>,
) -> Result<Json<PlaylistView>, ApiError> {
    let specs = body
        .tasks
        .into_iter()
        .map(|t| TaskSpec {
            title: t.title,
            duration_minutes: t.duration,
        })
        .collect();
    let view = state
        .engine
        .append_tasks(&PlaylistId::from_raw(id), specs)?;
    Ok(Json(view))
}

pub async fn cleanup_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RequiredDateQuery>,
) -> Result<Json<ResetOutcome>, ApiError> {
    let date = parse_date(&query.date)?;
    let outcome = state
        .engine
        .reset_for_date(&PlaylistId::from_raw(id), date)?;
    Ok(Json(outcome))
}

pub async fn reset_all(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.engine.reset_all()?;
    Ok(Json(json!({ "success": true })))
}

pub async fn playlist_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<StatsEntry>>, ApiError> {
    let start = parse_date(&query.start_date)?;
    let end = parse_date(&query.end_date)?;
    let counts = state.engine.completion_stats(start, end)?;
    let entries = counts
        .into_iter()
        .map(|c| StatsEntry {
            playlist_id: c.playlist_id.as_str().to_string(),
            name: c.name,
            count: c.count,
        })
        .collect();
    Ok(Json(entries))
}

pub async fn generate_tasks(
    State(state): State<AppState>,
    Json(body): Json<GenerateTasksRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.prompt.trim().is_empty() || body.playlist_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "prompt and playlistName are required".into(),
        ));
    }

    let generator = state.generator.as_ref().ok_or(ApiError::ProviderUnavailable)?;
    let tasks: Vec<GeneratedTask> = generator
        .generate(&body.playlist_name, &body.prompt)
        .await?;
    Ok(Json(json!({ "tasks": tasks })))
}
