//! Storage layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `requests` - Pending payment requests and the atomic approval transition
//! - `attempts` - Append-only match-attempt audit log
//! - `events` - Bank-transaction fingerprints for re-ingestion suppression

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod attempts;
mod events;
mod requests;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Format used for every datetime column
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Render a DateTime<Utc> the way the schema stores it
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Create a new database connection pool, running migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("kudi_test_{}_{}.db", std::process::id(), id));
        let _ = std::fs::remove_file(&path);

        Self::new(path.to_str().expect("temp path is valid UTF-8"))
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS payment_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reference TEXT NOT NULL UNIQUE,
                amount REAL NOT NULL,
                payer_name TEXT,
                account_number TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at TEXT,
                approved_at TEXT,
                approved_amount REAL,
                approval_reason TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_requests_status
                ON payment_requests(status, created_at);

            CREATE TABLE IF NOT EXISTS match_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER,
                request_reference TEXT,
                result TEXT NOT NULL,
                reason TEXT NOT NULL,
                request_amount REAL,
                request_payer_name TEXT,
                request_account_number TEXT,
                request_created_at TEXT,
                extracted_amount REAL,
                extracted_name TEXT,
                extracted_account_number TEXT,
                email_subject TEXT,
                email_from TEXT,
                email_date TEXT,
                amount_diff REAL,
                name_similarity_percent INTEGER,
                time_diff_minutes INTEGER,
                extraction_method TEXT,
                details TEXT,
                text_snippet TEXT,
                html_snippet TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_request
                ON match_attempts(request_id);
            CREATE INDEX IF NOT EXISTS idx_attempts_result
                ON match_attempts(result, created_at);

            CREATE TABLE IF NOT EXISTS bank_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bank TEXT NOT NULL,
                fingerprint TEXT NOT NULL UNIQUE,
                account_number TEXT NOT NULL,
                amount REAL NOT NULL,
                value_date TEXT NOT NULL,
                narration TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        info!(path = %self.db_path, "database migrations complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_create_the_schema() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        for table in ["payment_requests", "match_attempts", "bank_events"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn datetime_round_trips() {
        let now = Utc::now();
        let parsed = parse_datetime(&format_datetime(now));
        assert_eq!(parsed.timestamp(), now.timestamp());
    }
}
