//! Match-attempt audit log
//!
//! Every decision the engine takes (matched, unmatched, duplicate-dropped)
//! lands here with the full comparison context. Append-only; nothing ever
//! updates or deletes a row.

use rusqlite::{params, Row};

use crate::error::Result;
use crate::models::{MatchAttemptRecord, MatchResult, NewMatchAttempt};

use super::{format_datetime, parse_datetime, Database};

fn row_to_attempt(row: &Row<'_>) -> rusqlite::Result<MatchAttemptRecord> {
    let result: String = row.get("result")?;
    let request_created_at: Option<String> = row.get("request_created_at")?;
    let email_date: Option<String> = row.get("email_date")?;
    let created_at: String = row.get("created_at")?;
    let details: Option<String> = row.get("details")?;
    let similarity: Option<i64> = row.get("name_similarity_percent")?;
    Ok(MatchAttemptRecord {
        id: row.get("id")?,
        request_id: row.get("request_id")?,
        request_reference: row.get("request_reference")?,
        result: result.parse().unwrap_or(MatchResult::Unmatched),
        reason: row.get("reason")?,
        request_amount: row.get("request_amount")?,
        request_payer_name: row.get("request_payer_name")?,
        request_account_number: row.get("request_account_number")?,
        request_created_at: request_created_at.as_deref().map(parse_datetime),
        extracted_amount: row.get("extracted_amount")?,
        extracted_name: row.get("extracted_name")?,
        extracted_account_number: row.get("extracted_account_number")?,
        email_subject: row.get("email_subject")?,
        email_from: row.get("email_from")?,
        email_date: email_date.as_deref().map(parse_datetime),
        amount_diff: row.get("amount_diff")?,
        name_similarity_percent: similarity.map(|v| v.clamp(0, 100) as u8),
        time_diff_minutes: row.get("time_diff_minutes")?,
        extraction_method: row.get("extraction_method")?,
        details: details.and_then(|raw| serde_json::from_str(&raw).ok()),
        text_snippet: row.get("text_snippet")?,
        html_snippet: row.get("html_snippet")?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Append one attempt record
    pub fn insert_attempt(&self, attempt: &NewMatchAttempt) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO match_attempts (
                request_id, request_reference, result, reason,
                request_amount, request_payer_name, request_account_number, request_created_at,
                extracted_amount, extracted_name, extracted_account_number,
                email_subject, email_from, email_date,
                amount_diff, name_similarity_percent, time_diff_minutes,
                extraction_method, details, text_snippet, html_snippet
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                attempt.request_id,
                attempt.request_reference,
                attempt.result.unwrap_or(MatchResult::Unmatched).as_str(),
                attempt.reason,
                attempt.request_amount,
                attempt.request_payer_name,
                attempt.request_account_number,
                attempt.request_created_at.map(format_datetime),
                attempt.extracted_amount,
                attempt.extracted_name,
                attempt.extracted_account_number,
                attempt.email_subject,
                attempt.email_from,
                attempt.email_date.map(format_datetime),
                attempt.amount_diff,
                attempt.name_similarity_percent.map(|v| v as i64),
                attempt.time_diff_minutes,
                attempt.extraction_method,
                attempt.details.as_ref().map(|d| d.to_string()),
                attempt.text_snippet,
                attempt.html_snippet,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Attempts, newest first, optionally filtered by result
    pub fn list_attempts(
        &self,
        result: Option<MatchResult>,
        limit: i64,
    ) -> Result<Vec<MatchAttemptRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM match_attempts
             WHERE (?1 IS NULL OR result = ?1)
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![result.map(|r| r.as_str()), limit], row_to_attempt)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Full attempt history of one request, oldest first
    pub fn attempts_for_request(&self, request_id: i64) -> Result<Vec<MatchAttemptRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM match_attempts WHERE request_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([request_id], row_to_attempt)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Per-result attempt totals for the status surface
    pub fn attempt_counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT result, COUNT(*) FROM match_attempts GROUP BY result ORDER BY result",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
