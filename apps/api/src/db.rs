//! File-backed SQLite persistence. The pool is a deferred subsystem: it is
//! constructed on first use so a late-mounting data volume degrades health
//! instead of crashing boot.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, SqlitePool};
use tracing::info;

use crate::models::ChatHistoryRow;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS career_chat_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id TEXT NOT NULL,
    message TEXT NOT NULL,
    reply TEXT NOT NULL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS learning_chat_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id TEXT NOT NULL,
    message TEXT NOT NULL,
    reply TEXT NOT NULL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
";

/// Opens (creating if missing) the database file and applies the schema.
pub async fn create_pool(db_path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database at {db_path}"))?;

    // Raw (unprepared) execution: the schema holds multiple statements.
    pool.execute(SCHEMA)
        .await
        .context("failed to apply database schema")?;

    info!("SQLite database ready at {db_path}");
    Ok(pool)
}

/// Trivial read used by the health probe.
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

pub async fn save_career_chat(
    pool: &SqlitePool,
    thread_id: &str,
    message: &str,
    reply: &str,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO career_chat_history (thread_id, message, reply) VALUES (?, ?, ?)")
        .bind(thread_id)
        .bind(message)
        .bind(reply)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn save_learning_chat(
    pool: &SqlitePool,
    thread_id: &str,
    message: &str,
    reply: &str,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO learning_chat_history (thread_id, message, reply) VALUES (?, ?, ?)")
        .bind(thread_id)
        .bind(message)
        .bind(reply)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn career_history(
    pool: &SqlitePool,
    thread_id: &str,
) -> sqlx::Result<Vec<ChatHistoryRow>> {
    sqlx::query_as(
        "SELECT id, message, reply, timestamp FROM career_chat_history \
         WHERE thread_id = ? ORDER BY timestamp DESC",
    )
    .bind(thread_id)
    .fetch_all(pool)
    .await
}

/// Deletes the thread's learning history, returning how many rows went.
pub async fn clear_learning_chat(pool: &SqlitePool, thread_id: &str) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM learning_chat_history WHERE thread_id = ?")
        .bind(thread_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn learning_history(
    pool: &SqlitePool,
    thread_id: &str,
) -> sqlx::Result<Vec<ChatHistoryRow>> {
    sqlx::query_as(
        "SELECT id, message, reply, timestamp FROM learning_chat_history \
         WHERE thread_id = ? ORDER BY timestamp DESC",
    )
    .bind(thread_id)
    .fetch_all(pool)
    .await
}
