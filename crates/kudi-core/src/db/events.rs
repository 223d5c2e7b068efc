//! Bank-transaction fingerprint records
//!
//! One row per decoded bank notification, keyed by the deterministic
//! fingerprint. `INSERT OR IGNORE` makes re-ingestion suppression a single
//! statement: the second arrival of the same alert simply does not insert.

use chrono::NaiveDate;
use rusqlite::params;

use crate::error::Result;
use crate::models::Bank;

use super::Database;

impl Database {
    /// Record a decoded bank transaction; returns false when the same
    /// fingerprint was already seen.
    pub fn record_bank_event(
        &self,
        bank: Bank,
        fingerprint: &str,
        account_number: &str,
        amount: f64,
        value_date: NaiveDate,
        narration: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO bank_events
                (bank, fingerprint, account_number, amount, value_date, narration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bank.as_str(),
                fingerprint,
                account_number,
                amount,
                value_date.format("%Y-%m-%d").to_string(),
                narration,
            ],
        )?;
        Ok(inserted == 1)
    }

    /// Number of recorded bank events
    pub fn bank_event_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM bank_events", [], |row| row.get(0))?)
    }
}
