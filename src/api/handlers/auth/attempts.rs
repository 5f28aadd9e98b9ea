//! Append-only login-attempt ledger and the rate limiter over it.
//!
//! Rows are never updated or deleted; old attempts simply age out of the
//! limiter's window, and the table grows for the life of the database.
//! Callers without a resolvable address all share the literal `"unknown"`
//! bucket.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use tracing::Instrument;

/// Append one attempt row. Successes and failures are both recorded.
///
/// # Errors
/// Returns an error if the insert fails.
pub async fn record(
    pool: &SqlitePool,
    source_address: &str,
    succeeded: bool,
    now: i64,
) -> Result<()> {
    let query =
        "INSERT INTO login_attempts (source_address, attempted_at, succeeded) VALUES (?, ?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(source_address)
        .bind(now)
        .bind(succeeded)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record login attempt")?;
    Ok(())
}

/// Count failed attempts for an address strictly newer than
/// `now - window_seconds`.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn count_recent_failures(
    pool: &SqlitePool,
    source_address: &str,
    window_seconds: i64,
    now: i64,
) -> Result<i64> {
    let query = "SELECT COUNT(*) AS failures FROM login_attempts \
                 WHERE source_address = ? AND succeeded = 0 AND attempted_at > ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(source_address)
        .bind(now - window_seconds)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count recent login failures")?;
    Ok(row.get("failures"))
}

/// Rate-limit decision for a login submission.
///
/// Only failures count against the limit; a successful login does not clear
/// them; they age out of the window on their own.
///
/// # Errors
/// Returns an error if the ledger query fails.
pub async fn is_allowed(
    pool: &SqlitePool,
    source_address: &str,
    max_failures: i64,
    window_seconds: i64,
    now: i64,
) -> Result<bool> {
    let failures = count_recent_failures(pool, source_address, window_seconds, now).await?;
    Ok(failures < max_failures)
}
