//! Duplicate payment detection
//!
//! A transaction is a duplicate when an already-approved request carries the
//! same amount and payer name inside a trailing window. Duplicates are
//! dropped before the matcher ever sees them. Store errors fail open:
//! silently discarding a legitimate new payment is worse than the rare
//! double-processing the check exists to prevent.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::MatchConfig;
use crate::db::Database;
use crate::models::ExtractedTransaction;

pub struct DuplicateDetector<'a> {
    db: &'a Database,
    config: &'a MatchConfig,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(db: &'a Database, config: &'a MatchConfig) -> Self {
        Self { db, config }
    }

    /// Has a payment with this amount and payer already been approved inside
    /// the duplicate window?
    pub fn is_duplicate(&self, tx: &ExtractedTransaction, now: DateTime<Utc>) -> bool {
        let Some(amount) = tx.amount else {
            return false;
        };

        match self.db.has_recent_approval(
            amount,
            tx.sender_name.as_deref(),
            self.config.duplicate_window_minutes,
            now,
        ) {
            Ok(duplicate) => {
                if duplicate {
                    info!(
                        amount,
                        sender = tx.sender_name.as_deref().unwrap_or("-"),
                        "duplicate transaction suppressed"
                    );
                }
                duplicate
            }
            Err(e) => {
                warn!(error = %e, "duplicate check failed, failing open");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchDecision, NewPaymentRequest};

    fn approved_request(db: &Database, reference: &str, amount: f64, payer: Option<&str>) {
        let id = db
            .create_request(&NewPaymentRequest {
                reference: reference.to_string(),
                amount,
                payer_name: payer.map(str::to_string),
                account_number: None,
                expires_at: None,
            })
            .unwrap();
        let decision = MatchDecision {
            matched: true,
            ..MatchDecision::unmatched("")
        };
        db.approve_if_pending(id, &decision).unwrap();
    }

    fn tx(amount: f64, sender: Option<&str>) -> ExtractedTransaction {
        ExtractedTransaction {
            amount: Some(amount),
            sender_name: sender.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn repeat_of_recent_approval_is_duplicate() {
        let db = Database::in_memory().unwrap();
        let config = MatchConfig::default();
        approved_request(&db, "TX-1", 1000.0, Some("john agbo"));

        let detector = DuplicateDetector::new(&db, &config);
        assert!(detector.is_duplicate(&tx(1000.0, Some("john agbo")), Utc::now()));
    }

    #[test]
    fn different_amount_or_payer_is_not_duplicate() {
        let db = Database::in_memory().unwrap();
        let config = MatchConfig::default();
        approved_request(&db, "TX-1", 1000.0, Some("john agbo"));

        let detector = DuplicateDetector::new(&db, &config);
        assert!(!detector.is_duplicate(&tx(2000.0, Some("john agbo")), Utc::now()));
        assert!(!detector.is_duplicate(&tx(1000.0, Some("grace eze")), Utc::now()));
    }

    #[test]
    fn missing_amount_is_never_duplicate() {
        let db = Database::in_memory().unwrap();
        let config = MatchConfig::default();
        let detector = DuplicateDetector::new(&db, &config);
        assert!(!detector.is_duplicate(&tx(0.0, None), Utc::now()));

        let no_amount = ExtractedTransaction::default();
        assert!(!detector.is_duplicate(&no_amount, Utc::now()));
    }

    #[test]
    fn outside_window_is_not_duplicate() {
        let db = Database::in_memory().unwrap();
        let config = MatchConfig::default();
        approved_request(&db, "TX-1", 1000.0, Some("john agbo"));

        let detector = DuplicateDetector::new(&db, &config);
        let later = Utc::now() + chrono::Duration::minutes(config.duplicate_window_minutes + 5);
        assert!(!detector.is_duplicate(&tx(1000.0, Some("john agbo")), later));
    }
}
