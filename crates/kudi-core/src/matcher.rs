//! Payment-matching decision algorithm
//!
//! Pure function from (pending request, extracted transaction, email
//! timestamp, policy) to a decision. Failures to match are first-class
//! `matched = false` results with a reason, never errors; the request state
//! machine (pending → approved/rejected/expired, one-way) is enforced by the
//! store, not here.
//!
//! Policy, in evaluation order: the time window, then the payer-name gate,
//! then the amount rules — lenient when the name matched (an identified
//! payer may legitimately send a slightly different amount), exact
//! otherwise. A perfect amount match with a low-similarity name is accepted
//! and flagged, not rejected.

use chrono::{DateTime, Utc};

use crate::config::MatchConfig;
use crate::models::{ExtractedTransaction, MatchDecision, PendingPaymentRequest};
use crate::similarity::{name_similarity, normalize_name};

/// Compare one extracted transaction against one pending request.
///
/// `email_date` is the message arrival time; both it and the request
/// creation time are compared in UTC.
pub fn match_payment(
    request: &PendingPaymentRequest,
    tx: &ExtractedTransaction,
    email_date: Option<DateTime<Utc>>,
    config: &MatchConfig,
) -> MatchDecision {
    let Some(received) = tx.amount else {
        return MatchDecision::unmatched("No amount was extracted from the email");
    };

    // Time window check
    let time_diff_minutes = email_date.map(|email| (email - request.created_at).num_minutes());
    if let (Some(email), Some(diff)) = (email_date, time_diff_minutes) {
        if diff < 0 {
            return MatchDecision {
                time_diff_minutes: Some(diff),
                ..MatchDecision::unmatched(format!(
                    "Email received before transaction was created ({} minutes before). Request: {}, Email: {}",
                    -diff,
                    request.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    email.format("%Y-%m-%d %H:%M:%S UTC"),
                ))
            };
        }
        if diff > config.time_window_minutes {
            return MatchDecision {
                time_diff_minutes: Some(diff),
                ..MatchDecision::unmatched(format!(
                    "Time window exceeded: email received {} minutes after transaction (max {} minutes)",
                    diff, config.time_window_minutes,
                ))
            };
        }
    }

    // Positive when the received amount falls short. The tolerance gets a
    // hair of slack so a literal 1-kobo difference survives f64 rounding.
    let amount_diff = request.amount - received;
    let exact = amount_diff.abs() <= config.amount_tolerance + 1e-9;

    // Payer-name gate
    let mut name_similarity_percent = None;
    let mut name_matched = false;
    let mut name_flag: Option<String> = None;

    if let Some(expected_name) = request.payer_name.as_deref() {
        match tx.sender_name.as_deref() {
            None => {
                if !exact {
                    return MatchDecision {
                        amount_diff: Some(amount_diff),
                        time_diff_minutes,
                        name_similarity_percent: Some(0),
                        ..MatchDecision::unmatched(format!(
                            "Payer name required but not found in email. Expected \"{}\" and amount differs by ₦{:.2}",
                            expected_name,
                            amount_diff.abs(),
                        ))
                    };
                }
                name_similarity_percent = Some(0);
                name_flag = Some(format!(
                    "Expected payer \"{}\" but no sender name was extracted; approved on exact amount",
                    expected_name,
                ));
            }
            Some(sender) => {
                let similarity = name_similarity(expected_name, sender);
                name_similarity_percent = Some(similarity);
                name_matched = similarity >= config.name_similarity_threshold;

                if !name_matched {
                    if !exact {
                        return MatchDecision {
                            amount_diff: Some(amount_diff),
                            time_diff_minutes,
                            name_similarity_percent: Some(similarity),
                            ..MatchDecision::unmatched(format!(
                                "Name mismatch: expected \"{}\", got \"{}\" (similarity: {}%) and amount mismatch",
                                normalize_name(expected_name),
                                normalize_name(sender),
                                similarity,
                            ))
                        };
                    }
                    name_flag = Some(format!(
                        "Name mismatch: expected \"{}\", got \"{}\" (similarity: {}%); approved on exact amount",
                        normalize_name(expected_name),
                        normalize_name(sender),
                        similarity,
                    ));
                }
            }
        }
    }

    // Amount rules: lenient when the name matched, exact otherwise
    let mut mismatch_reason = name_flag;

    if name_matched {
        if amount_diff >= config.large_mismatch_ceiling {
            return MatchDecision {
                amount_diff: Some(amount_diff),
                time_diff_minutes,
                name_similarity_percent,
                ..MatchDecision::unmatched(format!(
                    "Amount mismatch too large: expected ₦{:.2}, received ₦{:.2} (shortfall: ₦{:.2}). Name matches but the difference exceeds the ₦{:.2} limit",
                    request.amount, received, amount_diff, config.large_mismatch_ceiling,
                ))
            };
        }
        if !exact {
            mismatch_reason = Some(if amount_diff > 0.0 {
                format!(
                    "Amount mismatch: expected ₦{:.2}, received ₦{:.2} (shortfall: ₦{:.2}). Approved because the payer name matches",
                    request.amount, received, amount_diff,
                )
            } else {
                format!(
                    "Amount mismatch: expected ₦{:.2}, received ₦{:.2} (overpayment: ₦{:.2}). Approved because the payer name matches",
                    request.amount, received, -amount_diff,
                )
            });
        }
    } else if !exact {
        // No name leniency available: the amount must match exactly
        return MatchDecision {
            amount_diff: Some(amount_diff),
            time_diff_minutes,
            name_similarity_percent,
            ..MatchDecision::unmatched(format!(
                "Amount mismatch: expected ₦{:.2}, received ₦{:.2} (difference: ₦{:.2}). Exact amount required",
                request.amount,
                received,
                amount_diff.abs(),
            ))
        };
    }

    let is_mismatch = mismatch_reason.is_some();
    MatchDecision {
        matched: true,
        reason: mismatch_reason
            .clone()
            .unwrap_or_else(|| "Amount and name match within time window".to_string()),
        amount_diff: Some(amount_diff),
        name_similarity_percent,
        time_diff_minutes,
        is_mismatch,
        received_amount: is_mismatch.then_some(received),
        mismatch_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::RequestStatus;

    fn request(amount: f64, payer_name: Option<&str>) -> PendingPaymentRequest {
        PendingPaymentRequest {
            id: 1,
            reference: "TX-1".to_string(),
            amount,
            payer_name: payer_name.map(str::to_string),
            account_number: Some("9008771210".to_string()),
            status: RequestStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2026, 1, 11, 9, 0, 0).unwrap(),
            expires_at: None,
        }
    }

    fn tx(amount: Option<f64>, sender: Option<&str>) -> ExtractedTransaction {
        ExtractedTransaction {
            amount,
            sender_name: sender.map(str::to_string),
            ..Default::default()
        }
    }

    fn within_window() -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2026, 1, 11, 9, 30, 0).unwrap())
    }

    #[test]
    fn exact_amount_without_payer_name_matches() {
        // Scenario A
        let decision = match_payment(
            &request(1000.0, None),
            &tx(Some(1000.0), None),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(decision.matched);
        assert!(!decision.is_mismatch);
        assert_eq!(decision.amount_diff, Some(0.0));
        assert_eq!(decision.time_diff_minutes, Some(30));
    }

    #[test]
    fn named_payer_with_small_shortfall_matches_flagged() {
        // Scenario B: similarity 100 (all expected tokens found), shortfall
        // 500 under the 5000 ceiling
        let decision = match_payment(
            &request(5000.0, Some("mary jane")),
            &tx(Some(4500.0), Some("mary jane okafor")),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(decision.matched);
        assert!(decision.is_mismatch);
        assert_eq!(decision.received_amount, Some(4500.0));
        let reason = decision.mismatch_reason.unwrap();
        assert!(reason.contains("₦500.00"), "reason was: {reason}");
        assert!(reason.contains("shortfall"));
    }

    #[test]
    fn email_before_request_creation_is_unmatched() {
        // Scenario C
        let early = Some(Utc.with_ymd_and_hms(2026, 1, 11, 8, 0, 0).unwrap());
        let decision = match_payment(
            &request(1000.0, None),
            &tx(Some(1000.0), None),
            early,
            &MatchConfig::default(),
        );
        assert!(!decision.matched);
        assert!(decision.reason.contains("before transaction was created"));
        assert_eq!(decision.time_diff_minutes, Some(-60));
    }

    #[test]
    fn time_window_exceeded_is_unmatched() {
        let late = Some(Utc.with_ymd_and_hms(2026, 1, 11, 11, 1, 0).unwrap());
        let decision = match_payment(
            &request(1000.0, None),
            &tx(Some(1000.0), None),
            late,
            &MatchConfig::default(),
        );
        assert!(!decision.matched);
        assert!(decision.reason.contains("Time window exceeded"));
        assert_eq!(decision.time_diff_minutes, Some(121));
    }

    #[test]
    fn tolerance_boundary_one_kobo_accepted() {
        let decision = match_payment(
            &request(1000.0, None),
            &tx(Some(999.99), None),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(decision.matched);
    }

    #[test]
    fn two_kobo_difference_rejected_without_name_match() {
        let decision = match_payment(
            &request(1000.0, None),
            &tx(Some(999.98), None),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(!decision.matched);
        assert!(decision.reason.contains("Exact amount required"));
    }

    #[test]
    fn large_shortfall_rejected_despite_name_match() {
        let decision = match_payment(
            &request(10000.0, Some("john agbo")),
            &tx(Some(5000.0), Some("john agbo")),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(!decision.matched);
        assert!(decision.reason.contains("exceeds"));
    }

    #[test]
    fn shortfall_just_under_ceiling_is_flagged_match() {
        let decision = match_payment(
            &request(10000.0, Some("john agbo")),
            &tx(Some(5000.01), Some("john agbo")),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(decision.matched);
        assert!(decision.is_mismatch);
    }

    #[test]
    fn overpayment_with_name_match_is_flagged() {
        let decision = match_payment(
            &request(1000.0, Some("john agbo")),
            &tx(Some(1200.0), Some("john agbo")),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(decision.matched);
        assert!(decision.is_mismatch);
        assert!(decision.mismatch_reason.unwrap().contains("overpayment"));
        assert_eq!(decision.received_amount, Some(1200.0));
    }

    #[test]
    fn low_similarity_with_exact_amount_is_accepted_flagged() {
        // The source accepts a perfect amount match even when the name is
        // unrecognizable; preserved deliberately
        let decision = match_payment(
            &request(1000.0, Some("mary jane")),
            &tx(Some(1000.0), Some("grace eze")),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(decision.matched);
        assert!(decision.is_mismatch);
        assert_eq!(decision.name_similarity_percent, Some(0));
    }

    #[test]
    fn low_similarity_with_amount_difference_is_unmatched() {
        let decision = match_payment(
            &request(1000.0, Some("mary jane")),
            &tx(Some(900.0), Some("grace eze")),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(!decision.matched);
        assert!(decision.reason.contains("Name mismatch"));
    }

    #[test]
    fn missing_name_with_exact_amount_is_accepted_flagged() {
        let decision = match_payment(
            &request(1000.0, Some("mary jane")),
            &tx(Some(1000.0), None),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(decision.matched);
        assert!(decision.is_mismatch);
        assert_eq!(decision.name_similarity_percent, Some(0));
    }

    #[test]
    fn missing_name_with_amount_difference_is_unmatched() {
        let decision = match_payment(
            &request(1000.0, Some("mary jane")),
            &tx(Some(900.0), None),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(!decision.matched);
        assert!(decision.reason.contains("Payer name required"));
    }

    #[test]
    fn no_timestamps_skips_the_window_check() {
        let decision = match_payment(
            &request(1000.0, None),
            &tx(Some(1000.0), None),
            None,
            &MatchConfig::default(),
        );
        assert!(decision.matched);
        assert_eq!(decision.time_diff_minutes, None);
    }

    #[test]
    fn missing_amount_never_matches() {
        let decision = match_payment(
            &request(1000.0, None),
            &tx(None, Some("john agbo")),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(!decision.matched);
    }

    #[test]
    fn reason_is_always_populated() {
        let matched = match_payment(
            &request(1000.0, None),
            &tx(Some(1000.0), None),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(!matched.reason.is_empty());

        let unmatched = match_payment(
            &request(1000.0, None),
            &tx(Some(2.0), None),
            within_window(),
            &MatchConfig::default(),
        );
        assert!(!unmatched.reason.is_empty());
    }
}
