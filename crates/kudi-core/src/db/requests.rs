//! Pending payment request operations
//!
//! The status column is the request's one-way state machine. Approval is a
//! single conditional UPDATE (`... WHERE id = ? AND status = 'pending'`);
//! under concurrent processing that conditional transition is the only
//! guard, so a request is approved at most once no matter how many emails
//! race for it.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{MatchDecision, NewPaymentRequest, PendingPaymentRequest, RequestStatus};

use super::{format_datetime, parse_datetime, Database};

fn row_to_request(row: &Row<'_>) -> rusqlite::Result<PendingPaymentRequest> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let expires_at: Option<String> = row.get("expires_at")?;
    Ok(PendingPaymentRequest {
        id: row.get("id")?,
        reference: row.get("reference")?,
        amount: row.get("amount")?,
        payer_name: row.get("payer_name")?,
        account_number: row.get("account_number")?,
        status: status.parse().unwrap_or(RequestStatus::Pending),
        created_at: parse_datetime(&created_at),
        expires_at: expires_at.as_deref().map(parse_datetime),
    })
}

impl Database {
    /// Register a new pending request
    pub fn create_request(&self, new: &NewPaymentRequest) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO payment_requests (reference, amount, payer_name, account_number, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.reference,
                new.amount,
                new.payer_name,
                new.account_number,
                new.expires_at.map(format_datetime),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_request(&self, id: i64) -> Result<PendingPaymentRequest> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM payment_requests WHERE id = ?1",
            [id],
            row_to_request,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("payment request {}", id)))
    }

    pub fn get_request_by_reference(&self, reference: &str) -> Result<PendingPaymentRequest> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM payment_requests WHERE reference = ?1",
            [reference],
            row_to_request,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("payment request {}", reference)))
    }

    /// Pending requests in stable creation order; the matcher's scan order
    pub fn list_pending_requests(&self) -> Result<Vec<PendingPaymentRequest>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM payment_requests WHERE status = 'pending'
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([], row_to_request)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Requests by status, newest first
    pub fn list_requests(
        &self,
        status: Option<RequestStatus>,
        limit: i64,
    ) -> Result<Vec<PendingPaymentRequest>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM payment_requests
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![status.map(|s| s.as_str()), limit], row_to_request)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Approve a request if and only if it is still pending.
    ///
    /// Returns false when the conditional transition lost (already approved,
    /// rejected, or expired) - the caller keeps scanning in that case.
    pub fn approve_if_pending(&self, id: i64, decision: &MatchDecision) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE payment_requests
             SET status = 'approved', approved_at = ?2, approved_amount = ?3, approval_reason = ?4
             WHERE id = ?1 AND status = 'pending'",
            params![
                id,
                format_datetime(Utc::now()),
                decision.received_amount,
                decision.reason,
            ],
        )?;
        debug!(request_id = id, won = changed == 1, "approval transition");
        Ok(changed == 1)
    }

    /// Reject a still-pending request (manual resettlement path)
    pub fn reject_request(&self, id: i64, reason: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE payment_requests
             SET status = 'rejected', approval_reason = ?2
             WHERE id = ?1 AND status = 'pending'",
            params![id, reason],
        )?;
        Ok(changed == 1)
    }

    /// Expire pending requests whose deadline has passed
    pub fn expire_overdue_requests(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE payment_requests
             SET status = 'expired'
             WHERE status = 'pending' AND expires_at IS NOT NULL AND expires_at < ?1",
            params![format_datetime(now)],
        )?;
        Ok(changed)
    }

    /// Is there an already-approved request with this amount and payer name
    /// inside the trailing duplicate window?
    pub fn has_recent_approval(
        &self,
        amount: f64,
        payer_name: Option<&str>,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let cutoff = now - chrono::Duration::minutes(window_minutes);
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM payment_requests
             WHERE status = 'approved'
               AND ABS(amount - ?1) < 0.005
               AND payer_name IS ?2
               AND approved_at >= ?3",
            params![amount, payer_name, format_datetime(cutoff)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
