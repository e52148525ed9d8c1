//! Remote document store backed by SQLite.
//!
//! One row per tour document, keyed by the record id. Timestamps live in
//! native DATETIME columns and are converted to/from RFC 3339 strings at
//! the store boundary; the rest of the record travels as a JSON document.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::errors::AppError;
use crate::models::TourRecord;

use super::TourBackend;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tours (
            id TEXT PRIMARY KEY,
            doc TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tours_updated_at ON tours(updated_at);")
        .execute(pool)
        .await?;

    Ok(())
}

/// Remote backend storing one document row per tour.
#[derive(Clone)]
pub struct RemoteStore {
    pool: SqlitePool,
}

impl RemoteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &TourRecord) -> Result<(), AppError> {
        let doc = serde_json::to_string(record)
            .map_err(|e| AppError::Database(format!("Failed to encode document: {}", e)))?;
        let created_at = parse_timestamp(&record.created_at);
        let now = Utc::now();

        sqlx::query("INSERT INTO tours (id, doc, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&record.id)
            .bind(&doc)
            .bind(created_at)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TourBackend for RemoteStore {
    /// List all documents, most recently updated first.
    async fn list(&self) -> Result<Vec<TourRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, doc, created_at, updated_at FROM tours ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TourRecord>, AppError> {
        let row = sqlx::query("SELECT id, doc, created_at, updated_at FROM tours WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn create(&self, record: &TourRecord) -> Result<(), AppError> {
        self.insert(record).await
    }

    async fn update(&self, record: &TourRecord) -> Result<(), AppError> {
        let doc = serde_json::to_string(record)
            .map_err(|e| AppError::Database(format!("Failed to encode document: {}", e)))?;
        let now = Utc::now();

        let result = sqlx::query("UPDATE tours SET doc = ?, updated_at = ? WHERE id = ?")
            .bind(&doc)
            .bind(now)
            .bind(&record.id)
            .execute(&self.pool)
            .await?;

        // Updating an unknown document is an error here, unlike the local
        // store; the facade treats it as any other remote failure.
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tour {} not found", record.id)));
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tours WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Destructive bulk overwrite: delete everything, then insert each
    /// record. Deliberately not a transaction; a failure mid-way leaves the
    /// store partially repopulated.
    async fn replace_all(&self, records: &[TourRecord]) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tours").execute(&self.pool).await?;

        for record in records {
            self.insert(record).await?;
        }

        Ok(())
    }

    async fn clear_all(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tours").execute(&self.pool).await?;
        Ok(())
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<TourRecord, AppError> {
    let doc: String = row.get("doc");
    let mut record: TourRecord = serde_json::from_str(&doc)
        .map_err(|e| AppError::Database(format!("Failed to decode document: {}", e)))?;

    // Row metadata wins over whatever the document embeds.
    record.id = row.get("id");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");
    record.created_at = created_at.to_rfc3339();
    record.updated_at = updated_at.to_rfc3339();

    Ok(record)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
