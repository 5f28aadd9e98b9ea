//! The single master-credential row.
//!
//! An existence check gates creation; the fixed primary key backstops it, so
//! two racing setup requests cannot both win.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use tracing::Instrument;

use super::password;

/// Outcome when attempting to store the master credential.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyInitialized,
}

/// True once setup has run. Absence means the system is in setup-required
/// state.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn exists(pool: &SqlitePool) -> Result<bool> {
    let query = "SELECT 1 FROM master_credential LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check for master credential")?;
    Ok(row.is_some())
}

/// Store the master credential. At most one row is ever permitted.
///
/// # Errors
/// Returns an error if the insert fails for any reason other than the row
/// already existing.
pub async fn create(pool: &SqlitePool, password_hash: &str, now: i64) -> Result<CreateOutcome> {
    if exists(pool).await? {
        return Ok(CreateOutcome::AlreadyInitialized);
    }

    let query = "INSERT INTO master_credential (id, password_hash, created_at) VALUES (1, ?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(password_hash)
        .bind(now)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(CreateOutcome::Created),
        Err(err) if is_constraint_violation(&err) => Ok(CreateOutcome::AlreadyInitialized),
        Err(err) => Err(err).context("failed to insert master credential"),
    }
}

/// Fetch the stored hash, if setup has run.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn fetch_hash(pool: &SqlitePool) -> Result<Option<String>> {
    let query = "SELECT password_hash FROM master_credential WHERE id = 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch master credential")?;
    Ok(row.map(|row| row.get("password_hash")))
}

/// Verify a plaintext candidate against the stored hash.
///
/// A missing credential verifies false rather than erroring; login treats an
/// uninitialized system and a wrong password the same way.
///
/// # Errors
/// Returns an error if the lookup fails.
pub async fn verify(pool: &SqlitePool, plaintext: &str) -> Result<bool> {
    let Some(hash) = fetch_hash(pool).await? else {
        return Ok(false);
    };
    Ok(password::verify_password(plaintext, &hash))
}

/// Replace the stored hash in place (password rotation).
///
/// # Errors
/// Returns an error if the update fails.
pub async fn update(pool: &SqlitePool, new_hash: &str) -> Result<()> {
    let query = "UPDATE master_credential SET password_hash = ? WHERE id = 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(new_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update master credential")?;
    Ok(())
}

fn is_constraint_violation(err: &sqlx::Error) -> bool {
    match err {
        // 1555 = SQLITE_CONSTRAINT_PRIMARYKEY, 2067 = SQLITE_CONSTRAINT_UNIQUE
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.as_ref() == "1555" || code.as_ref() == "2067"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::db::testing;

    #[tokio::test]
    async fn exists_flips_after_create() {
        let pool = testing::pool().await;
        assert!(!exists(&pool).await.expect("exists"));

        let outcome = create(&pool, "hash", 100).await.expect("create");
        assert_eq!(outcome, CreateOutcome::Created);
        assert!(exists(&pool).await.expect("exists"));
    }

    #[tokio::test]
    async fn second_create_reports_already_initialized() {
        let pool = testing::pool().await;
        create(&pool, "hash", 100).await.expect("create");

        let outcome = create(&pool, "other", 200).await.expect("create");
        assert_eq!(outcome, CreateOutcome::AlreadyInitialized);

        // The original hash survived.
        let hash = fetch_hash(&pool).await.expect("fetch");
        assert_eq!(hash.as_deref(), Some("hash"));
    }

    #[tokio::test]
    async fn verify_accepts_only_the_exact_plaintext() {
        let pool = testing::pool().await;
        let hash = password::hash_password("Passw0rd!").expect("hash");
        create(&pool, &hash, 100).await.expect("create");

        assert!(verify(&pool, "Passw0rd!").await.expect("verify"));
        assert!(!verify(&pool, "Passw0rd").await.expect("verify"));
        assert!(!verify(&pool, "passw0rd!").await.expect("verify"));
    }

    #[tokio::test]
    async fn verify_is_false_before_setup() {
        let pool = testing::pool().await;
        assert!(!verify(&pool, "anything").await.expect("verify"));
    }

    #[tokio::test]
    async fn update_rotates_the_hash() {
        let pool = testing::pool().await;
        let old_hash = password::hash_password("Passw0rd!").expect("hash");
        create(&pool, &old_hash, 100).await.expect("create");

        let new_hash = password::hash_password("N3w-Secret!").expect("hash");
        update(&pool, &new_hash).await.expect("update");

        assert!(verify(&pool, "N3w-Secret!").await.expect("verify"));
        assert!(!verify(&pool, "Passw0rd!").await.expect("verify"));
    }
}
