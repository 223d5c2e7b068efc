//! Integration tests for kudi-core
//!
//! These exercise the full extract → dedup → match → approve → audit
//! pipeline against a real (temporary) store.

use chrono::{NaiveDate, Utc};

use kudi_core::{
    description, name_similarity, Database, MatchResult, NewPaymentRequest, Outcome,
    RawEmailMessage, Reconciler, RequestStatus,
};

fn store() -> Database {
    Database::in_memory().expect("failed to create store")
}

fn request(db: &Database, reference: &str, amount: f64, payer: Option<&str>) -> i64 {
    db.create_request(&NewPaymentRequest {
        reference: reference.to_string(),
        amount,
        payer_name: payer.map(str::to_string),
        account_number: Some("9008771210".to_string()),
        expires_at: None,
    })
    .expect("failed to create request")
}

fn bank_alert(text: &str) -> RawEmailMessage {
    RawEmailMessage {
        subject: "Credit Alert".to_string(),
        from: "alerts@examplebank.ng".to_string(),
        text_body: text.to_string(),
        html_body: String::new(),
        received_at: Some(Utc::now()),
        account_id: None,
    }
}

// =============================================================================
// Full pipeline
// =============================================================================

#[test]
fn amount_only_request_approves_on_exact_amount() {
    let db = store();
    let id = request(&db, "TX-1", 1000.0, None);
    let engine = Reconciler::new(db);

    let outcome = engine
        .process_email(&bank_alert(
            "Amount : NGN 1,000.00\nDescription : 9008771210021008599510000020260111094651392 FROM SOLOMON INNOCENT AMITHY TO SQUAD",
        ))
        .unwrap();

    let Outcome::Matched { request_id, decision, .. } = outcome else {
        panic!("expected a match");
    };
    assert_eq!(request_id, id);
    assert!(!decision.is_mismatch);

    let approved = engine.db().get_request(id).unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
}

#[test]
fn named_payer_shortfall_approves_with_mismatch_flag() {
    // request{amount=5000, payer="mary jane"} + tx{4500, "mary jane okafor"}
    // → matched, flagged, reason cites the ₦500 shortfall
    let db = store();
    let id = request(&db, "TX-1", 5000.0, Some("mary jane"));
    let engine = Reconciler::new(db);

    let outcome = engine
        .process_email(&bank_alert(
            "Amount : NGN 4,500.00\nFROM MARY JANE OKAFOR TO SQUAD",
        ))
        .unwrap();

    let Outcome::Matched { decision, .. } = outcome else {
        panic!("expected a match");
    };
    assert!(decision.is_mismatch);
    assert_eq!(decision.received_amount, Some(4500.0));
    let reason = decision.mismatch_reason.as_deref().unwrap();
    assert!(reason.contains("₦500.00"), "reason: {reason}");

    // Downstream bookkeeping sees the actual received amount
    let attempts = engine.db().attempts_for_request(id).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].extracted_amount, Some(4500.0));
    assert_eq!(attempts[0].result, MatchResult::Matched);
}

#[test]
fn duplicate_alert_never_reaches_a_second_request() {
    let db = store();
    request(&db, "TX-1", 1000.0, Some("john agbo"));
    request(&db, "TX-2", 1000.0, Some("john agbo"));
    let engine = Reconciler::new(db);

    let email = bank_alert("Amount : NGN 1,000.00\nFROM JOHN AGBO TO SQUAD");
    assert!(matches!(
        engine.process_email(&email).unwrap(),
        Outcome::Matched { .. }
    ));
    assert!(matches!(
        engine.process_email(&email).unwrap(),
        Outcome::Duplicate
    ));

    // Exactly one request consumed, one duplicate on record
    assert_eq!(engine.db().list_pending_requests().unwrap().len(), 1);
    assert_eq!(
        engine
            .db()
            .list_attempts(Some(MatchResult::Duplicate), 10)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn every_outcome_lands_in_the_audit_log() {
    let db = store();
    request(&db, "TX-1", 250.0, None);
    let engine = Reconciler::new(db);

    // Unmatched (wrong amount), then matched
    engine
        .process_email(&bank_alert("Amount : NGN 100.00"))
        .unwrap();
    engine
        .process_email(&bank_alert("Amount : NGN 250.00"))
        .unwrap();

    let counts = engine.db().attempt_counts().unwrap();
    assert!(counts.contains(&("matched".to_string(), 1)));
    assert!(counts.contains(&("unmatched".to_string(), 1)));

    // Snippets are captured for forensics
    let attempts = engine.db().list_attempts(None, 10).unwrap();
    assert!(attempts
        .iter()
        .all(|a| a.text_snippet.as_deref().is_some_and(|s| s.contains("NGN"))));
}

// =============================================================================
// Decoder and similarity properties
// =============================================================================

#[test]
fn valid_blobs_always_yield_ten_digit_accounts_and_real_dates() {
    let cases = [
        ("0123456789", "9876543210", 1u64, "20240229", "000000000"),
        ("9008771210", "0210085995", 100000, "20260111", "094651392"),
        ("1111111111", "2222222222", 999999, "19991231", "123456789"),
    ];
    for (dest, src, amount, date, filler) in cases {
        let blob = format!("{dest}{src}{amount:06}{date}{filler}");
        assert_eq!(blob.len(), 43);
        let decoded = description::decode(&blob).unwrap();
        assert_eq!(decoded.destination.len(), 10);
        assert!(decoded.destination.bytes().all(|b| b.is_ascii_digit()));
        assert!(decoded.value_date.is_some(), "date {date} should parse");
    }
}

#[test]
fn encode_decode_round_trip_recovers_all_fields() {
    let dest = "9008771210";
    let src = "0210085995";
    let amount_minor = 123456u64;
    let date = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();

    let blob = format!(
        "{dest}{src}{amount_minor:06}{}{filler}",
        date.format("%Y%m%d"),
        filler = "000000001",
    );
    let decoded = description::decode(&blob).unwrap();

    assert_eq!(decoded.destination, dest);
    assert_eq!(decoded.source.as_deref(), Some(src));
    assert_eq!(decoded.amount_minor, Some(amount_minor));
    assert_eq!(decoded.value_date, Some(date));
}

#[test]
fn similarity_is_order_and_case_independent() {
    assert_eq!(name_similarity("JOHN SMITH", "SMITH JOHN"), 100);
    assert_eq!(name_similarity("john smith", "SMITH JOHN"), 100);
}

#[test]
fn scenario_d_description_strategy() {
    let db = store();
    request(&db, "TX-1", 250.0, Some("solomon innocent amithy"));
    let engine = Reconciler::new(db);

    let outcome = engine
        .process_email(&bank_alert(
            "Amount : NGN 250.00\nDescription : 9008771210021008599510000020260111094651392 FROM SOLOMON INNOCENT AMITHY TO SQUAD",
        ))
        .unwrap();

    let Outcome::Matched { request_id, .. } = outcome else {
        panic!("expected a match");
    };
    let attempts = engine.db().attempts_for_request(request_id).unwrap();
    assert_eq!(
        attempts[0].extracted_account_number.as_deref(),
        Some("9008771210")
    );
    assert_eq!(
        attempts[0].extracted_name.as_deref(),
        Some("solomon innocent amithy")
    );
}
