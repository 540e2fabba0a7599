//! Persistence sink for processed quotes.
//!
//! Records are write-once and append-only. The pipeline treats every sink
//! error as non-fatal, so implementations just report what went wrong.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Mutex;

use crate::config::DbConfig;
use crate::db;
use crate::error::QuoteError;
use crate::migrate;
use crate::models::{QuoteRecord, QuoteResponse};

#[async_trait]
pub trait QuoteSink: Send + Sync {
    async fn insert(&self, record: &QuoteRecord) -> Result<(), QuoteError>;
}

/// Projects a response onto the persisted row shape.
///
/// `raw_content` keeps at most `raw_content_limit` characters of
/// `combined_text`; the hash covers the full text.
pub fn build_record(
    response: &QuoteResponse,
    combined_text: &str,
    raw_content_limit: usize,
) -> QuoteRecord {
    let raw_content: String = combined_text.chars().take(raw_content_limit).collect();
    let content_sha256 = format!("{:x}", Sha256::digest(combined_text.as_bytes()));
    let extraction = &response.extraction;

    QuoteRecord {
        id: uuid::Uuid::new_v4().to_string(),
        raw_content,
        content_sha256,
        total_quote: response.total_quote,
        guestroom_total: extraction.guestroom_total,
        meeting_room_total: extraction.meeting_room_total,
        food_beverage_total: extraction.food_beverage_total,
        confidence: extraction.confidence,
        ai_notes: extraction.ai_notes.clone(),
        has_linked_content: response.has_linked_content,
        linked_content_fetched: response.linked_content_fetched as i64,
        linked_content_errors: serde_json::to_string(&response.linked_content_errors)
            .unwrap_or_else(|_| "[]".to_string()),
        content_length: response.content_length as i64,
        processed_at: response.processed_at.clone(),
        calculation_breakdown: serde_json::to_string(&extraction.calculation_breakdown)
            .unwrap_or_else(|_| "null".to_string()),
    }
}

// ============ SQLite ============

/// Writes to the `quotes` table.
pub struct SqliteQuoteStore {
    pool: SqlitePool,
}

impl SqliteQuoteStore {
    /// Connects and ensures the schema exists.
    pub async fn open(config: &DbConfig) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::create_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl QuoteSink for SqliteQuoteStore {
    async fn insert(&self, record: &QuoteRecord) -> Result<(), QuoteError> {
        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, raw_content, content_sha256, total_quote, guestroom_total,
                meeting_room_total, food_beverage_total, confidence, ai_notes,
                has_linked_content, linked_content_fetched, linked_content_errors,
                content_length, processed_at, calculation_breakdown
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.raw_content)
        .bind(&record.content_sha256)
        .bind(record.total_quote)
        .bind(record.guestroom_total)
        .bind(record.meeting_room_total)
        .bind(record.food_beverage_total)
        .bind(record.confidence)
        .bind(&record.ai_notes)
        .bind(record.has_linked_content)
        .bind(record.linked_content_fetched)
        .bind(&record.linked_content_errors)
        .bind(record.content_length)
        .bind(&record.processed_at)
        .bind(&record.calculation_breakdown)
        .execute(&self.pool)
        .await
        .map_err(|e| QuoteError::PersistenceFailed {
            detail: e.to_string(),
        })?;

        Ok(())
    }
}

// ============ In-memory ============

/// Keeps records in a `Vec`; for tests.
#[derive(Default)]
pub struct MemoryQuoteStore {
    records: Mutex<Vec<QuoteRecord>>,
    fail: bool,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every insert fails.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<QuoteRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl QuoteSink for MemoryQuoteStore {
    async fn insert(&self, record: &QuoteRecord) -> Result<(), QuoteError> {
        if self.fail {
            return Err(QuoteError::PersistenceFailed {
                detail: "sink configured to fail".to_string(),
            });
        }
        self.records
            .lock()
            .map_err(|_| QuoteError::PersistenceFailed {
                detail: "record lock poisoned".to_string(),
            })?
            .push(record.clone());
        Ok(())
    }
}

// ============ Disabled ============

/// Discards every record (`persistence.enabled = false`).
pub struct NullQuoteStore;

#[async_trait]
impl QuoteSink for NullQuoteStore {
    async fn insert(&self, _record: &QuoteRecord) -> Result<(), QuoteError> {
        Ok(())
    }
}
