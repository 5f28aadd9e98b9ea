//! Task CRUD and the kanban board.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{error, Instrument};

use super::auth::RequireSession;
use super::{brands, now_unix_seconds, valid_date};

pub(crate) const STATUSES: &[&str] = &["todo", "in_progress", "done"];
pub(crate) const PRIORITIES: &[&str] = &["low", "medium", "high"];

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub brand_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub brand_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: String,
}

/// Tasks grouped by kanban column.
#[derive(Debug, Serialize)]
pub struct TaskBoardResponse {
    pub todo: Vec<TaskResponse>,
    pub in_progress: Vec<TaskResponse>,
    pub done: Vec<TaskResponse>,
}

/// `GET /tasks`
pub async fn board(_session: RequireSession, pool: Extension<SqlitePool>) -> impl IntoResponse {
    let todo = match fetch_tasks_by_status(&pool, "todo").await {
        Ok(rows) => rows,
        Err(err) => return board_error(&err),
    };
    let in_progress = match fetch_tasks_by_status(&pool, "in_progress").await {
        Ok(rows) => rows,
        Err(err) => return board_error(&err),
    };
    let done = match fetch_tasks_by_status(&pool, "done").await {
        Ok(rows) => rows,
        Err(err) => return board_error(&err),
    };

    Json(TaskBoardResponse {
        todo,
        in_progress,
        done,
    })
    .into_response()
}

fn board_error(err: &anyhow::Error) -> axum::response::Response {
    error!("Failed to load task board: {err}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// `POST /tasks`
pub async fn create(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Json(payload): Json<TaskPayload>,
) -> impl IntoResponse {
    if let Err(response) = validate_payload(&payload) {
        return response;
    }
    match brands::brand_exists(&pool, payload.brand_id).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to check brand for task: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match insert_task(&pool, &payload, now_unix_seconds()).await {
        Ok(task) => (StatusCode::CREATED, Json(task)).into_response(),
        Err(err) => {
            error!("Failed to create task: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /tasks/:id`
pub async fn fetch(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(task_id): Path<i64>,
) -> impl IntoResponse {
    match fetch_task(&pool, task_id).await {
        Ok(Some(task)) => Json(task).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch task: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /tasks/:id/update`
pub async fn update(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(task_id): Path<i64>,
    Json(payload): Json<TaskPayload>,
) -> impl IntoResponse {
    if let Err(response) = validate_payload(&payload) {
        return response;
    }
    match brands::brand_exists(&pool, payload.brand_id).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to check brand for task: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match update_task(&pool, task_id, &payload, now_unix_seconds()).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update task: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /tasks/:id/update_status`: the kanban drag endpoint.
pub async fn update_status(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(task_id): Path<i64>,
    Json(payload): Json<StatusPayload>,
) -> impl IntoResponse {
    if !STATUSES.contains(&payload.status.as_str()) {
        return (StatusCode::BAD_REQUEST, "Unknown task status.").into_response();
    }

    match update_task_status(&pool, task_id, &payload.status, now_unix_seconds()).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update task status: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /tasks/:id/delete`
pub async fn delete(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(task_id): Path<i64>,
) -> impl IntoResponse {
    match delete_task(&pool, task_id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete task: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn validate_payload(payload: &TaskPayload) -> Result<(), axum::response::Response> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Task title is required.").into_response());
    }
    if let Some(status) = payload.status.as_deref() {
        if !STATUSES.contains(&status) {
            return Err((StatusCode::BAD_REQUEST, "Unknown task status.").into_response());
        }
    }
    if let Some(priority) = payload.priority.as_deref() {
        if !PRIORITIES.contains(&priority) {
            return Err((StatusCode::BAD_REQUEST, "Unknown task priority.").into_response());
        }
    }
    if let Some(due_date) = normalized_due_date(payload) {
        if !valid_date(due_date) {
            return Err(
                (StatusCode::BAD_REQUEST, "Due date must be YYYY-MM-DD.").into_response(),
            );
        }
    }
    Ok(())
}

/// An empty or whitespace due date means "no due date".
fn normalized_due_date(payload: &TaskPayload) -> Option<&str> {
    payload
        .due_date
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn task_from_row(row: &SqliteRow) -> TaskResponse {
    TaskResponse {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        priority: row.get("priority"),
        due_date: row.get("due_date"),
        brand_id: row.get("brand_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(crate) async fn fetch_tasks_by_status(
    pool: &SqlitePool,
    status: &str,
) -> Result<Vec<TaskResponse>> {
    let query = "SELECT * FROM tasks WHERE status = ? ORDER BY due_date ASC, id ASC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(status)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch tasks by status")?;
    Ok(rows.iter().map(task_from_row).collect())
}

/// Open tasks for the dashboard, soonest due first.
pub(crate) async fn fetch_open_tasks(pool: &SqlitePool, limit: i64) -> Result<Vec<TaskResponse>> {
    let query =
        "SELECT * FROM tasks WHERE status = 'todo' ORDER BY due_date ASC, id ASC LIMIT ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch open tasks")?;
    Ok(rows.iter().map(task_from_row).collect())
}

pub(crate) async fn fetch_tasks_for_brand(
    pool: &SqlitePool,
    brand_id: i64,
) -> Result<Vec<TaskResponse>> {
    let query = "SELECT * FROM tasks WHERE brand_id = ? ORDER BY id ASC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(brand_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch tasks for brand")?;
    Ok(rows.iter().map(task_from_row).collect())
}

pub(crate) async fn fetch_task(pool: &SqlitePool, task_id: i64) -> Result<Option<TaskResponse>> {
    let query = "SELECT * FROM tasks WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(task_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch task")?;
    Ok(row.as_ref().map(task_from_row))
}

async fn insert_task(pool: &SqlitePool, payload: &TaskPayload, now: i64) -> Result<TaskResponse> {
    let status = payload.status.as_deref().unwrap_or("todo");
    let priority = payload.priority.as_deref().unwrap_or("medium");
    let due_date = normalized_due_date(payload);

    let query = "INSERT INTO tasks \
                 (title, description, status, priority, due_date, brand_id, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(payload.title.trim())
        .bind(payload.description.as_deref())
        .bind(status)
        .bind(priority)
        .bind(due_date)
        .bind(payload.brand_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert task")?;

    Ok(TaskResponse {
        id: result.last_insert_rowid(),
        title: payload.title.trim().to_string(),
        description: payload.description.clone(),
        status: status.to_string(),
        priority: priority.to_string(),
        due_date: due_date.map(str::to_string),
        brand_id: payload.brand_id,
        created_at: now,
        updated_at: now,
    })
}

async fn update_task(
    pool: &SqlitePool,
    task_id: i64,
    payload: &TaskPayload,
    now: i64,
) -> Result<bool> {
    let status = payload.status.as_deref().unwrap_or("todo");
    let priority = payload.priority.as_deref().unwrap_or("medium");
    let due_date = normalized_due_date(payload);

    let query = "UPDATE tasks \
                 SET title = ?, description = ?, status = ?, priority = ?, due_date = ?, \
                     brand_id = ?, updated_at = ? \
                 WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(payload.title.trim())
        .bind(payload.description.as_deref())
        .bind(status)
        .bind(priority)
        .bind(due_date)
        .bind(payload.brand_id)
        .bind(now)
        .bind(task_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update task")?;
    Ok(result.rows_affected() > 0)
}

async fn update_task_status(
    pool: &SqlitePool,
    task_id: i64,
    status: &str,
    now: i64,
) -> Result<bool> {
    let query = "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(status)
        .bind(now)
        .bind(task_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update task status")?;
    Ok(result.rows_affected() > 0)
}

async fn delete_task(pool: &SqlitePool, task_id: i64) -> Result<bool> {
    let query = "DELETE FROM tasks WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(task_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete task")?;
    Ok(result.rows_affected() > 0)
}
