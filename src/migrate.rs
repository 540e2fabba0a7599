use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::DbConfig;
use crate::db;

pub async fn run_migrations(config: &DbConfig) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent; safe to run on every startup.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Append-only; no uniqueness beyond the row id.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quotes (
            id TEXT PRIMARY KEY,
            raw_content TEXT NOT NULL,
            content_sha256 TEXT NOT NULL,
            total_quote REAL,
            guestroom_total REAL,
            meeting_room_total REAL,
            food_beverage_total REAL,
            confidence REAL,
            ai_notes TEXT,
            has_linked_content INTEGER NOT NULL,
            linked_content_fetched INTEGER NOT NULL,
            linked_content_errors TEXT NOT NULL DEFAULT '[]',
            content_length INTEGER NOT NULL,
            processed_at TEXT NOT NULL,
            calculation_breakdown TEXT NOT NULL DEFAULT 'null'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_quotes_processed_at ON quotes(processed_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
