//! Schema bootstrap for the SQLite database.
//!
//! All statements are idempotent (`IF NOT EXISTS`) so startup can apply them
//! unconditionally against new and existing database files alike.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

const SCHEMA: &[&str] = &[
    // The fixed primary key caps this table at one row.
    r"
    CREATE TABLE IF NOT EXISTS master_credential (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        password_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    ",
    // Append-only; rows are never updated or deleted.
    r"
    CREATE TABLE IF NOT EXISTS login_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_address TEXT NOT NULL,
        attempted_at INTEGER NOT NULL,
        succeeded INTEGER NOT NULL DEFAULT 0
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_login_attempts_source
        ON login_attempts (source_address, attempted_at)
    ",
    r"
    CREATE TABLE IF NOT EXISTS brands (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        color TEXT NOT NULL DEFAULT '#3B82F6',
        created_at INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'todo',
        priority TEXT NOT NULL DEFAULT 'medium',
        due_date TEXT,
        brand_id INTEGER NOT NULL REFERENCES brands (id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS shoots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        shoot_date TEXT NOT NULL,
        location TEXT,
        attachments TEXT,
        brand_id INTEGER NOT NULL REFERENCES brands (id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS content_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        file_url TEXT NOT NULL,
        content_type TEXT,
        folder_path TEXT,
        brand_id INTEGER NOT NULL REFERENCES brands (id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL
    )
    ",
];

/// Create any missing tables and indexes.
///
/// # Errors
/// Returns an error if a schema statement fails to apply.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("failed to apply schema statement: {statement}"))?;
    }
    debug!("database schema up to date");
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::migrate;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    /// Fresh in-memory database with the schema applied.
    ///
    /// A single connection keeps the in-memory database alive and shared.
    pub(crate) async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        migrate(&pool).await.expect("schema");
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = testing::pool().await;
        migrate(&pool).await.expect("second run");
    }

    #[tokio::test]
    async fn cascade_removes_children() {
        let pool = testing::pool().await;
        sqlx::query("INSERT INTO brands (name, created_at) VALUES ('Acme', 0)")
            .execute(&pool)
            .await
            .expect("brand");
        sqlx::query(
            "INSERT INTO tasks (title, brand_id, created_at, updated_at) VALUES ('t', 1, 0, 0)",
        )
        .execute(&pool)
        .await
        .expect("task");

        sqlx::query("DELETE FROM brands WHERE id = 1")
            .execute(&pool)
            .await
            .expect("delete brand");

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(remaining, 0);
    }
}
