//! Pending payment request commands

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};

use kudi_core::{Database, NewPaymentRequest, RequestStatus};

pub fn cmd_request_add(
    db: &Database,
    reference: &str,
    amount: f64,
    payer: Option<&str>,
    account: Option<&str>,
    expires_minutes: Option<i64>,
) -> Result<()> {
    if amount <= 0.0 {
        bail!("amount must be positive, got {amount}");
    }

    let id = db
        .create_request(&NewPaymentRequest {
            reference: reference.to_string(),
            amount,
            payer_name: payer.map(str::to_string),
            account_number: account.map(str::to_string),
            expires_at: expires_minutes.map(|m| Utc::now() + Duration::minutes(m)),
        })
        .with_context(|| format!("failed to register request {reference}"))?;

    println!("Registered request {reference} (id {id}) for ₦{amount:.2}");
    if let Some(payer) = payer {
        println!("Expected payer: {payer}");
    }
    Ok(())
}

pub fn cmd_request_list(db: &Database, status: Option<&str>, limit: i64) -> Result<()> {
    let status = status
        .map(|s| {
            s.parse::<RequestStatus>()
                .map_err(|e| anyhow::anyhow!(e))
        })
        .transpose()?;

    let requests = db.list_requests(status, limit)?;
    if requests.is_empty() {
        println!("No requests");
        return Ok(());
    }

    println!(
        "{:<6} {:<16} {:>12} {:<10} {:<20} {}",
        "ID", "REFERENCE", "AMOUNT", "STATUS", "CREATED", "PAYER"
    );
    for r in requests {
        println!(
            "{:<6} {:<16} {:>12} {:<10} {:<20} {}",
            r.id,
            r.reference,
            format!("₦{:.2}", r.amount),
            r.status,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.payer_name.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

pub fn cmd_request_expire(db: &Database) -> Result<()> {
    let expired = db.expire_overdue_requests(Utc::now())?;
    println!("Expired {expired} overdue request(s)");
    Ok(())
}
