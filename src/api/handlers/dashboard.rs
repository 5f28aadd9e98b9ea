//! Landing dashboard: every brand, the next open tasks, upcoming shoots.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::error;

use super::auth::RequireSession;
use super::{brands, shoots, tasks};

const RECENT_TASK_LIMIT: i64 = 5;
const UPCOMING_SHOOT_LIMIT: i64 = 3;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub brands: Vec<brands::BrandResponse>,
    pub recent_tasks: Vec<tasks::TaskResponse>,
    pub upcoming_shoots: Vec<shoots::ShootResponse>,
}

/// `GET /`
pub async fn index(_session: RequireSession, pool: Extension<SqlitePool>) -> impl IntoResponse {
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

    let all_brands = match brands::fetch_brands(&pool).await {
        Ok(rows) => rows,
        Err(err) => return dashboard_error(&err),
    };
    let recent_tasks = match tasks::fetch_open_tasks(&pool, RECENT_TASK_LIMIT).await {
        Ok(rows) => rows,
        Err(err) => return dashboard_error(&err),
    };
    let upcoming_shoots = match shoots::fetch_upcoming(&pool, &today, UPCOMING_SHOOT_LIMIT).await {
        Ok(rows) => rows,
        Err(err) => return dashboard_error(&err),
    };

    Json(DashboardResponse {
        brands: all_brands,
        recent_tasks,
        upcoming_shoots,
    })
    .into_response()
}

fn dashboard_error(err: &anyhow::Error) -> axum::response::Response {
    error!("Failed to load dashboard: {err}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
