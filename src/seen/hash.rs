// src/seen/hash.rs
//! Content-hash seen-set on SQLite.
//!
//! One table, `hash` as primary key. Inserts are `INSERT OR IGNORE`, so the
//! existence check and the insert are a single statement: two items with the
//! same hash can never both be reported as new, even from concurrent tasks.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub title: String,
    pub source: String,
    pub recorded_at: DateTime<Utc>,
}

pub struct HashStore {
    pool: SqlitePool,
}

impl HashStore {
    /// Open (creating if needed) the database file and ensure the table exists.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating db dir {}", parent.display()))?;
        }
        let url = format!("sqlite://{}", db_path.display());
        let opts = SqliteConnectOptions::from_str(&url)
            .context("sqlite connect options")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .with_context(|| format!("opening seen db {}", db_path.display()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database; a single connection keeps it alive.
    pub async fn open_in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").context("sqlite memory")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .context("opening in-memory seen db")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen (
                hash TEXT PRIMARY KEY,
                title TEXT,
                source TEXT,
                ts TEXT
            )"#,
        )
        .execute(&self.pool)
        .await
        .context("creating seen table")?;
        Ok(())
    }

    pub async fn has(&self, hash: &str) -> Result<bool> {
        let row: Option<i64> = sqlx::query_scalar("SELECT 1 FROM seen WHERE hash = ?1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .context("querying seen hash")?;
        Ok(row.is_some())
    }

    /// Insert-if-absent. Returns `true` when the hash was new and is now recorded,
    /// `false` when it already existed (the stored record is left untouched).
    pub async fn insert(&self, hash: &str, rec: &HashRecord) -> Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT OR IGNORE INTO seen (hash, title, source, ts)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(hash)
        .bind(&rec.title)
        .bind(&rec.source)
        .bind(rec.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("inserting seen hash")?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn get(&self, hash: &str) -> Result<Option<HashRecord>> {
        let row: Option<(Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT title, source, ts FROM seen WHERE hash = ?1")
                .bind(hash)
                .fetch_optional(&self.pool)
                .await
                .context("reading seen hash")?;
        Ok(row.map(|(title, source, ts)| HashRecord {
            title: title.unwrap_or_default(),
            source: source.unwrap_or_default(),
            recorded_at: ts
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default(),
        }))
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen")
            .fetch_one(&self.pool)
            .await
            .context("counting seen hashes")?;
        Ok(n)
    }

    pub async fn close(self) {
        let n = self.count().await.unwrap_or(-1);
        self.pool.close().await;
        info!(records = n, "seen db closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn has_reflects_insert() {
        let store = HashStore::open_in_memory().await.unwrap();
        assert!(!store.has("abc").await.unwrap());
        let rec = HashRecord {
            title: "t".into(),
            source: "s".into(),
            recorded_at: Utc::now(),
        };
        assert!(store.insert("abc", &rec).await.unwrap());
        assert!(store.has("abc").await.unwrap());
    }
}
