//! Brand CRUD. A brand owns its tasks, shoots, and content items; deleting
//! one takes everything attached to it along.

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
use super::{content, now_unix_seconds, shoots, tasks};

pub(crate) const DEFAULT_COLOR: &str = "#3B82F6";

#[derive(Debug, Serialize)]
pub struct BrandResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct BrandPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// A brand plus everything attached to it.
#[derive(Debug, Serialize)]
pub struct BrandDetailResponse {
    #[serde(flatten)]
    pub brand: BrandResponse,
    pub tasks: Vec<tasks::TaskResponse>,
    pub shoots: Vec<shoots::ShootResponse>,
    pub content_items: Vec<content::ContentItemResponse>,
}

/// `GET /brands`
pub async fn list(_session: RequireSession, pool: Extension<SqlitePool>) -> impl IntoResponse {
    match fetch_brands(&pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => {
            error!("Failed to list brands: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /brands`
pub async fn create(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Json(payload): Json<BrandPayload>,
) -> impl IntoResponse {
    let name = payload.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Brand name is required.").into_response();
    }
    let color = payload
        .color
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_COLOR);

    match insert_brand(
        &pool,
        name,
        payload.description.as_deref(),
        color,
        now_unix_seconds(),
    )
    .await
    {
        Ok(brand) => (StatusCode::CREATED, Json(brand)).into_response(),
        Err(err) => {
            error!("Failed to create brand: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /brands/:id`
pub async fn detail(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(brand_id): Path<i64>,
) -> impl IntoResponse {
    let brand = match fetch_brand(&pool, brand_id).await {
        Ok(Some(brand)) => brand,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return detail_error(&err),
    };
    let brand_tasks = match tasks::fetch_tasks_for_brand(&pool, brand_id).await {
        Ok(rows) => rows,
        Err(err) => return detail_error(&err),
    };
    let brand_shoots = match shoots::fetch_shoots_for_brand(&pool, brand_id).await {
        Ok(rows) => rows,
        Err(err) => return detail_error(&err),
    };
    let brand_content = match content::fetch_content_for_brand(&pool, brand_id).await {
        Ok(rows) => rows,
        Err(err) => return detail_error(&err),
    };

    Json(BrandDetailResponse {
        brand,
        tasks: brand_tasks,
        shoots: brand_shoots,
        content_items: brand_content,
    })
    .into_response()
}

fn detail_error(err: &anyhow::Error) -> axum::response::Response {
    error!("Failed to load brand detail: {err}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// `POST /brands/:id`
pub async fn update(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(brand_id): Path<i64>,
    Json(payload): Json<BrandPayload>,
) -> impl IntoResponse {
    let name = payload.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Brand name is required.").into_response();
    }
    let color = payload
        .color
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_COLOR);

    match update_brand(&pool, brand_id, name, payload.description.as_deref(), color).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update brand: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /brands/:id/delete`: cascades to tasks, shoots, and content items.
pub async fn delete(
    _session: RequireSession,
    pool: Extension<SqlitePool>,
    Path(brand_id): Path<i64>,
) -> impl IntoResponse {
    match delete_brand(&pool, brand_id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete brand: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn brand_from_row(row: &SqliteRow) -> BrandResponse {
    BrandResponse {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
        created_at: row.get("created_at"),
    }
}

pub(crate) async fn fetch_brands(pool: &SqlitePool) -> Result<Vec<BrandResponse>> {
    let query = "SELECT * FROM brands ORDER BY name ASC, id ASC";
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
        .context("failed to fetch brands")?;
    Ok(rows.iter().map(brand_from_row).collect())
}

pub(crate) async fn fetch_brand(pool: &SqlitePool, brand_id: i64) -> Result<Option<BrandResponse>> {
    let query = "SELECT * FROM brands WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(brand_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch brand")?;
    Ok(row.as_ref().map(brand_from_row))
}

/// Cheap existence probe used when other entities reference a brand.
pub(crate) async fn brand_exists(pool: &SqlitePool, brand_id: i64) -> Result<bool> {
    let query = "SELECT 1 FROM brands WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(brand_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check brand existence")?;
    Ok(row.is_some())
}

pub(crate) async fn insert_brand(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
    color: &str,
    now: i64,
) -> Result<BrandResponse> {
    let query = "INSERT INTO brands (name, description, color, created_at) VALUES (?, ?, ?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(name)
        .bind(description)
        .bind(color)
        .bind(now)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert brand")?;

    Ok(BrandResponse {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        description: description.map(str::to_string),
        color: color.to_string(),
        created_at: now,
    })
}

async fn update_brand(
    pool: &SqlitePool,
    brand_id: i64,
    name: &str,
    description: Option<&str>,
    color: &str,
) -> Result<bool> {
    let query = "UPDATE brands SET name = ?, description = ?, color = ? WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(name)
        .bind(description)
        .bind(color)
        .bind(brand_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update brand")?;
    Ok(result.rows_affected() > 0)
}

async fn delete_brand(pool: &SqlitePool, brand_id: i64) -> Result<bool> {
    let query = "DELETE FROM brands WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(brand_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete brand")?;
    Ok(result.rows_affected() > 0)
}
