//! Content-calendar items. Files live in external storage; only their URLs
//! are kept here.

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
use super::{brands, now_unix_seconds};

#[derive(Debug, Serialize)]
pub struct ContentItemResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub content_type: Option<String>,
    pub folder_path: Option<String>,
    pub brand_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ContentItemPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub brand_id: i64,
    pub file_url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub folder_path: Option<String>,
}

/// `GET /content_calendar`: newest first.
pub async fn calendar(_session: RequireSession, pool: Extension<SqlitePool>) -> impl IntoResponse {
    match fetch_content_items(&pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => {
            error!("Failed to list content items: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /content`
pub async fn create(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Json(payload): Json<ContentItemPayload>,
) -> impl IntoResponse {
    if let Err(response) = validate_payload(&payload) {
        return response;
    }
    match brands::brand_exists(&pool, payload.brand_id).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to check brand for content item: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match insert_content_item(&pool, &payload, now_unix_seconds()).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(err) => {
            error!("Failed to create content item: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /content/:id`
pub async fn fetch(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(content_id): Path<i64>,
) -> impl IntoResponse {
    match fetch_content_item(&pool, content_id).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch content item: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /content/:id/update`
pub async fn update(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(content_id): Path<i64>,
    Json(payload): Json<ContentItemPayload>,
) -> impl IntoResponse {
    if let Err(response) = validate_payload(&payload) {
        return response;
    }
    match brands::brand_exists(&pool, payload.brand_id).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to check brand for content item: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match update_content_item(&pool, content_id, &payload).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update content item: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /content/:id/delete`
pub async fn delete(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(content_id): Path<i64>,
) -> impl IntoResponse {
    match delete_content_item(&pool, content_id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete content item: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn validate_payload(payload: &ContentItemPayload) -> Result<(), axum::response::Response> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Content title is required.").into_response());
    }
    if payload.file_url.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "A file URL is required.").into_response());
    }
    Ok(())
}

fn content_item_from_row(row: &SqliteRow) -> ContentItemResponse {
    ContentItemResponse {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        file_url: row.get("file_url"),
        content_type: row.get("content_type"),
        folder_path: row.get("folder_path"),
        brand_id: row.get("brand_id"),
        created_at: row.get("created_at"),
    }
}

pub(crate) async fn fetch_content_items(pool: &SqlitePool) -> Result<Vec<ContentItemResponse>> {
    let query = "SELECT * FROM content_items ORDER BY created_at DESC, id DESC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch content items")?;
    Ok(rows.iter().map(content_item_from_row).collect())
}

pub(crate) async fn fetch_content_for_brand(
    pool: &SqlitePool,
    brand_id: i64,
) -> Result<Vec<ContentItemResponse>> {
    let query = "SELECT * FROM content_items WHERE brand_id = ? ORDER BY created_at DESC, id DESC";
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
        .context("failed to fetch content items for brand")?;
    Ok(rows.iter().map(content_item_from_row).collect())
}

pub(crate) async fn fetch_content_item(
    pool: &SqlitePool,
    content_id: i64,
) -> Result<Option<ContentItemResponse>> {
    let query = "SELECT * FROM content_items WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(content_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch content item")?;
    Ok(row.as_ref().map(content_item_from_row))
}

async fn insert_content_item(
    pool: &SqlitePool,
    payload: &ContentItemPayload,
    now: i64,
) -> Result<ContentItemResponse> {
    let content_type = trimmed_optional(payload.content_type.as_deref());
    let folder_path = trimmed_optional(payload.folder_path.as_deref());

    let query = "INSERT INTO content_items \
                 (title, description, file_url, content_type, folder_path, brand_id, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(payload.title.trim())
        .bind(payload.description.as_deref())
        .bind(payload.file_url.trim())
        .bind(content_type)
        .bind(folder_path)
        .bind(payload.brand_id)
        .bind(now)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert content item")?;

    Ok(ContentItemResponse {
        id: result.last_insert_rowid(),
        title: payload.title.trim().to_string(),
        description: payload.description.clone(),
        file_url: payload.file_url.trim().to_string(),
        content_type: content_type.map(str::to_string),
        folder_path: folder_path.map(str::to_string),
        brand_id: payload.brand_id,
        created_at: now,
    })
}

async fn update_content_item(
    pool: &SqlitePool,
    content_id: i64,
    payload: &ContentItemPayload,
) -> Result<bool> {
    let content_type = trimmed_optional(payload.content_type.as_deref());
    let folder_path = trimmed_optional(payload.folder_path.as_deref());

    let query = "UPDATE content_items \
                 SET title = ?, description = ?, file_url = ?, content_type = ?, \
                     folder_path = ?, brand_id = ? \
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
        .bind(payload.file_url.trim())
        .bind(content_type)
        .bind(folder_path)
        .bind(payload.brand_id)
        .bind(content_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update content item")?;
    Ok(result.rows_affected() > 0)
}

async fn delete_content_item(pool: &SqlitePool, content_id: i64) -> Result<bool> {
    let query = "DELETE FROM content_items WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(content_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete content item")?;
    Ok(result.rows_affected() > 0)
}

fn trimmed_optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
