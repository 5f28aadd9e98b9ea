//! Shoot scheduling CRUD.
//!
//! Attachments are external URLs only (no file storage); they live in a JSON
//! text column and are decoded on the way out.

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

#[derive(Debug, Serialize)]
pub struct ShootResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub shoot_date: String,
    pub location: Option<String>,
    pub attachments: Vec<String>,
    pub brand_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShootPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub brand_id: i64,
    pub shoot_date: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<String>>,
}

/// `GET /shoots`: all shoots, soonest first.
pub async fn list(_session: RequireSession, pool: Extension<SqlitePool>) -> impl IntoResponse {
    match fetch_shoots(&pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => {
            error!("Failed to list shoots: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /shoots`
pub async fn create(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Json(payload): Json<ShootPayload>,
) -> impl IntoResponse {
    if let Err(response) = validate_payload(&payload) {
        return response;
    }
    match brands::brand_exists(&pool, payload.brand_id).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to check brand for shoot: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match insert_shoot(&pool, &payload, now_unix_seconds()).await {
        Ok(shoot) => (StatusCode::CREATED, Json(shoot)).into_response(),
        Err(err) => {
            error!("Failed to create shoot: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /shoots/:id`
pub async fn fetch(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(shoot_id): Path<i64>,
) -> impl IntoResponse {
    match fetch_shoot(&pool, shoot_id).await {
        Ok(Some(shoot)) => Json(shoot).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch shoot: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /shoots/:id/update`
pub async fn update(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(shoot_id): Path<i64>,
    Json(payload): Json<ShootPayload>,
) -> impl IntoResponse {
    if let Err(response) = validate_payload(&payload) {
        return response;
    }
    match brands::brand_exists(&pool, payload.brand_id).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to check brand for shoot: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match update_shoot(&pool, shoot_id, &payload).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update shoot: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /shoots/:id/delete`
pub async fn delete(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(shoot_id): Path<i64>,
) -> impl IntoResponse {
    match delete_shoot(&pool, shoot_id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete shoot: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn validate_payload(payload: &ShootPayload) -> Result<(), axum::response::Response> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Shoot title is required.").into_response());
    }
    if !valid_date(payload.shoot_date.trim()) {
        return Err((StatusCode::BAD_REQUEST, "Shoot date must be YYYY-MM-DD.").into_response());
    }
    Ok(())
}

/// Trim the attachment list and drop empty entries, as submitted forms tend
/// to carry blank rows.
fn cleaned_attachments(payload: &ShootPayload) -> Vec<String> {
    payload
        .attachments
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn encode_attachments(attachments: &[String]) -> Result<Option<String>> {
    if attachments.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(attachments)
        .map(Some)
        .context("failed to encode shoot attachments")
}

fn decode_attachments(raw: Option<String>) -> Vec<String> {
    raw.and_then(|value| serde_json::from_str(&value).ok())
        .unwrap_or_default()
}

fn shoot_from_row(row: &SqliteRow) -> ShootResponse {
    ShootResponse {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        shoot_date: row.get("shoot_date"),
        location: row.get("location"),
        attachments: decode_attachments(row.get("attachments")),
        brand_id: row.get("brand_id"),
        created_at: row.get("created_at"),
    }
}

pub(crate) async fn fetch_shoots(pool: &SqlitePool) -> Result<Vec<ShootResponse>> {
    let query = "SELECT * FROM shoots ORDER BY shoot_date ASC, id ASC";
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
        .context("failed to fetch shoots")?;
    Ok(rows.iter().map(shoot_from_row).collect())
}

/// Upcoming shoots for the dashboard: `shoot_date >= today`, soonest first.
pub(crate) async fn fetch_upcoming(
    pool: &SqlitePool,
    today: &str,
    limit: i64,
) -> Result<Vec<ShootResponse>> {
    let query =
        "SELECT * FROM shoots WHERE shoot_date >= ? ORDER BY shoot_date ASC, id ASC LIMIT ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(today)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch upcoming shoots")?;
    Ok(rows.iter().map(shoot_from_row).collect())
}

pub(crate) async fn fetch_shoots_for_brand(
    pool: &SqlitePool,
    brand_id: i64,
) -> Result<Vec<ShootResponse>> {
    let query = "SELECT * FROM shoots WHERE brand_id = ? ORDER BY shoot_date ASC, id ASC";
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
        .context("failed to fetch shoots for brand")?;
    Ok(rows.iter().map(shoot_from_row).collect())
}

pub(crate) async fn fetch_shoot(
    pool: &SqlitePool,
    shoot_id: i64,
) -> Result<Option<ShootResponse>> {
    let query = "SELECT * FROM shoots WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(shoot_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch shoot")?;
    Ok(row.as_ref().map(shoot_from_row))
}

async fn insert_shoot(pool: &SqlitePool, payload: &ShootPayload, now: i64) -> Result<ShootResponse> {
    let attachments = cleaned_attachments(payload);
    let encoded = encode_attachments(&attachments)?;
    let location = payload
        .location
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let query = "INSERT INTO shoots \
                 (title, description, shoot_date, location, attachments, brand_id, created_at) \
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
        .bind(payload.shoot_date.trim())
        .bind(location)
        .bind(encoded.as_deref())
        .bind(payload.brand_id)
        .bind(now)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert shoot")?;

    Ok(ShootResponse {
        id: result.last_insert_rowid(),
        title: payload.title.trim().to_string(),
        description: payload.description.clone(),
        shoot_date: payload.shoot_date.trim().to_string(),
        location: location.map(str::to_string),
        attachments,
        brand_id: payload.brand_id,
        created_at: now,
    })
}

async fn update_shoot(pool: &SqlitePool, shoot_id: i64, payload: &ShootPayload) -> Result<bool> {
    let attachments = cleaned_attachments(payload);
    let encoded = encode_attachments(&attachments)?;
    let location = payload
        .location
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let query = "UPDATE shoots \
                 SET title = ?, description = ?, shoot_date = ?, location = ?, attachments = ?, \
                     brand_id = ? \
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
        .bind(payload.shoot_date.trim())
        .bind(location)
        .bind(encoded.as_deref())
        .bind(payload.brand_id)
        .bind(shoot_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update shoot")?;
    Ok(result.rows_affected() > 0)
}

async fn delete_shoot(pool: &SqlitePool, shoot_id: i64) -> Result<bool> {
    let query = "DELETE FROM shoots WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(shoot_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete shoot")?;
    Ok(result.rows_affected() > 0)
}
