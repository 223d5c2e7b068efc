//! Audit log inspection

use anyhow::Result;

use kudi_core::{Database, MatchResult};

pub fn cmd_attempts(db: &Database, result: Option<&str>, limit: i64) -> Result<()> {
    let result = result
        .map(|s| s.parse::<MatchResult>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()?;

    let attempts = db.list_attempts(result, limit)?;
    if attempts.is_empty() {
        println!("No attempts recorded");
        return Ok(());
    }

    for a in attempts {
        println!(
            "#{} [{}] {} {}",
            a.id,
            a.result,
            a.created_at.format("%Y-%m-%d %H:%M:%S"),
            a.request_reference.as_deref().unwrap_or("-"),
        );
        println!("    reason: {}", a.reason);
        if let (Some(expected), Some(received)) = (a.request_amount, a.extracted_amount) {
            print!("    amount: expected ₦{expected:.2}, received ₦{received:.2}");
            if let Some(sim) = a.name_similarity_percent {
                print!("  name similarity: {sim}%");
            }
            if let Some(mins) = a.time_diff_minutes {
                print!("  time diff: {mins}m");
            }
            println!();
        }
    }
    Ok(())
}

pub fn cmd_status(db: &Database) -> Result<()> {
    let pending = db.list_pending_requests()?;
    println!("Pending requests : {}", pending.len());

    let counts = db.attempt_counts()?;
    if counts.is_empty() {
        println!("Match attempts   : none");
    } else {
        for (result, count) in counts {
            println!("Attempts {:<9}: {}", result, count);
        }
    }

    println!("Bank events      : {}", db.bank_event_count()?);
    Ok(())
}
