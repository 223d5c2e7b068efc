//! The reconciliation pipeline
//!
//! One synchronous run per inbound email: normalize and extract (dedicated
//! bank decoder first when the sender is recognized), suppress duplicates,
//! then scan pending requests in creation order until one matches. The
//! approval itself is the store's conditional pending-to-approved
//! transition, so racing emails cannot approve the same request twice; this
//! engine holds no lock and performs no retry.
//!
//! Every email reaches a terminal outcome - matched, unmatched, or
//! duplicate-dropped - and every decision is recorded in the attempt log.
//! Attempt-log failures are caught and surfaced without rolling back an
//! otherwise successful decision.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::banks::{self, TemplateRegistry};
use crate::config::MatchConfig;
use crate::db::Database;
use crate::dedup::DuplicateDetector;
use crate::error::{Error, Result};
use crate::extract;
use crate::matcher::match_payment;
use crate::models::{
    ExtractedTransaction, MatchDecision, MatchResult, NewMatchAttempt, PendingPaymentRequest,
    RawEmailMessage,
};
use crate::normalize::truncate_snippet;

/// Length cap for the audit snippets
const SNIPPET_LIMIT: usize = 500;

/// Terminal result of processing one email
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A pending request was approved
    Matched {
        request_id: i64,
        reference: String,
        decision: MatchDecision,
    },
    /// No pending request qualified (or nothing could be extracted)
    Unmatched { reason: String },
    /// Dropped before matching: already-processed transaction
    Duplicate,
}

/// The extraction + matching engine over one store
pub struct Reconciler {
    db: Database,
    config: MatchConfig,
    registry: TemplateRegistry,
}

impl Reconciler {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            config: MatchConfig::default(),
            registry: TemplateRegistry::builtin(),
        }
    }

    pub fn with_config(db: Database, config: MatchConfig) -> Self {
        Self {
            db,
            config,
            registry: TemplateRegistry::builtin(),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Process one inbound email to its terminal outcome.
    ///
    /// Only storage failures on the decision path itself raise; extraction
    /// and matching problems are ordinary unmatched outcomes.
    pub fn process_email(&self, msg: &RawEmailMessage) -> Result<Outcome> {
        let content = extract::EmailContent::from_message(msg);

        // Dedicated bank decoder ahead of generic extraction
        let tx = match self.registry.recognize(&content) {
            Some(bank) => match banks::decode(bank, &content, &self.config) {
                Ok(decoded) => {
                    let fresh = self.db.record_bank_event(
                        decoded.bank,
                        &decoded.fingerprint,
                        decoded.tx.account_number.as_deref().unwrap_or(""),
                        decoded.tx.amount.unwrap_or(0.0),
                        decoded.tx.value_date.unwrap_or_default(),
                        &decoded.narration,
                    )?;
                    if !fresh {
                        info!(bank = %decoded.bank, "bank event already ingested, dropping");
                        self.log_attempt(self.attempt(
                            msg,
                            Some(&decoded.tx),
                            None,
                            MatchResult::Duplicate,
                            format!(
                                "Transaction already ingested (fingerprint {})",
                                &decoded.fingerprint[..12],
                            ),
                            None,
                        ));
                        return Ok(Outcome::Duplicate);
                    }
                    decoded.tx
                }
                // A recognized bank that fails its own decode is a hard
                // parse failure; generic heuristics must not run
                Err(Error::BankDecode { bank, reason }) => {
                    let full_reason =
                        format!("Dedicated decode failed for {}: {}", bank, reason);
                    warn!(bank = %bank, reason = %reason, "bank template decode failed");
                    self.log_attempt(self.attempt(
                        msg,
                        None,
                        None,
                        MatchResult::Unmatched,
                        full_reason.clone(),
                        None,
                    ));
                    return Ok(Outcome::Unmatched {
                        reason: full_reason,
                    });
                }
                Err(other) => return Err(other),
            },
            None => match extract::extract_transaction(msg, &self.config) {
                Some(tx) => tx,
                None => {
                    let reason = "Could not extract any payment information from email".to_string();
                    self.log_attempt(self.attempt(
                        msg,
                        None,
                        None,
                        MatchResult::Unmatched,
                        reason.clone(),
                        None,
                    ));
                    return Ok(Outcome::Unmatched { reason });
                }
            },
        };

        info!(
            amount = tx.amount.unwrap_or(0.0),
            sender = tx.sender_name.as_deref().unwrap_or("-"),
            account = tx.account_number.as_deref().unwrap_or("-"),
            method = tx.method.map(|m| m.as_str()).unwrap_or("-"),
            "extracted transaction"
        );

        // Duplicate suppression before any request is considered
        let now = msg.received_at.unwrap_or_else(Utc::now);
        if DuplicateDetector::new(&self.db, &self.config).is_duplicate(&tx, now) {
            self.log_attempt(self.attempt(
                msg,
                Some(&tx),
                None,
                MatchResult::Duplicate,
                "Already-approved payment with same amount and payer inside duplicate window"
                    .to_string(),
                None,
            ));
            return Ok(Outcome::Duplicate);
        }

        // Scan pending requests; first qualifying match wins
        let pending = self.db.list_pending_requests()?;
        if pending.is_empty() {
            let reason = "No pending requests to match against".to_string();
            self.log_attempt(self.attempt(
                msg,
                Some(&tx),
                None,
                MatchResult::Unmatched,
                reason.clone(),
                None,
            ));
            return Ok(Outcome::Unmatched { reason });
        }

        for request in &pending {
            let decision = match_payment(request, &tx, msg.received_at, &self.config);
            self.log_attempt(self.attempt(
                msg,
                Some(&tx),
                Some(request),
                if decision.matched {
                    MatchResult::Matched
                } else {
                    MatchResult::Unmatched
                },
                decision.reason.clone(),
                Some(&decision),
            ));

            if !decision.matched {
                debug!(reference = %request.reference, reason = %decision.reason, "request did not match");
                continue;
            }

            // The store's conditional transition is the concurrency guard;
            // losing it just means another email got here first
            if self.db.approve_if_pending(request.id, &decision)? {
                info!(
                    reference = %request.reference,
                    is_mismatch = decision.is_mismatch,
                    "payment matched and approved"
                );
                return Ok(Outcome::Matched {
                    request_id: request.id,
                    reference: request.reference.clone(),
                    decision,
                });
            }
            debug!(reference = %request.reference, "lost approval race, continuing scan");
        }

        Ok(Outcome::Unmatched {
            reason: "No pending request matched the extracted transaction".to_string(),
        })
    }

    /// Build an attempt record from whatever context this decision had
    fn attempt(
        &self,
        msg: &RawEmailMessage,
        tx: Option<&ExtractedTransaction>,
        request: Option<&PendingPaymentRequest>,
        result: MatchResult,
        reason: String,
        decision: Option<&MatchDecision>,
    ) -> NewMatchAttempt {
        NewMatchAttempt {
            request_id: request.map(|r| r.id),
            request_reference: request.map(|r| r.reference.clone()),
            result: Some(result),
            reason,
            request_amount: request.map(|r| r.amount),
            request_payer_name: request.and_then(|r| r.payer_name.clone()),
            request_account_number: request.and_then(|r| r.account_number.clone()),
            request_created_at: request.map(|r| r.created_at),
            extracted_amount: tx.and_then(|t| t.amount),
            extracted_name: tx.and_then(|t| t.sender_name.clone()),
            extracted_account_number: tx.and_then(|t| t.account_number.clone()),
            email_subject: Some(msg.subject.clone()),
            email_from: Some(msg.from.clone()),
            email_date: msg.received_at,
            amount_diff: decision.and_then(|d| d.amount_diff),
            name_similarity_percent: decision.and_then(|d| d.name_similarity_percent),
            time_diff_minutes: decision.and_then(|d| d.time_diff_minutes),
            extraction_method: tx.and_then(|t| t.method.map(|m| m.as_str().to_string())),
            details: Some(json!({
                "decision": decision,
                "diagnostics": tx.map(|t| &t.diagnostics),
                "description_blob": tx.and_then(|t| t.description_blob.as_deref()),
                "amount_source": tx.and_then(|t| t.amount_source.map(|s| s.as_str())),
            })),
            text_snippet: truncate_snippet(&msg.text_body, SNIPPET_LIMIT),
            html_snippet: truncate_snippet(&msg.html_body, SNIPPET_LIMIT),
        }
    }

    /// Append to the attempt log; failures are surfaced, never fatal
    fn log_attempt(&self, attempt: NewMatchAttempt) {
        if let Err(e) = self.db.insert_attempt(&attempt) {
            error!(error = %e, "failed to record match attempt");
        }
    }
}
