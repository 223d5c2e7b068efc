//! .eml ingestion and standalone extraction

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use mailparse::{MailHeaderMap, ParsedMail};
use tracing::warn;

use kudi_core::{
    extract, match_payment, Database, MatchConfig, Outcome, RawEmailMessage, Reconciler,
};

/// Read an .eml file into the engine's input shape.
///
/// Walks MIME parts recursively, collecting the first text/plain and
/// text/html bodies; transfer encodings are decoded by the parser.
pub fn read_eml(path: &Path) -> Result<RawEmailMessage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed =
        mailparse::parse_mail(&bytes).with_context(|| format!("failed to parse {}", path.display()))?;

    let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();
    let from = parsed.headers.get_first_value("From").unwrap_or_default();
    let received_at = parsed
        .headers
        .get_first_value("Date")
        .and_then(|raw| mailparse::dateparse(&raw).ok())
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single());

    let mut text_body = String::new();
    let mut html_body = String::new();
    collect_bodies(&parsed, &mut text_body, &mut html_body);

    Ok(RawEmailMessage {
        subject,
        from,
        text_body,
        html_body,
        received_at,
        account_id: None,
    })
}

fn collect_bodies(part: &ParsedMail<'_>, text: &mut String, html: &mut String) {
    if part.subparts.is_empty() {
        let body = match part.get_body() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "unreadable MIME part skipped");
                return;
            }
        };
        match part.ctype.mimetype.to_lowercase().as_str() {
            "text/plain" if text.is_empty() => *text = body,
            "text/html" if html.is_empty() => *html = body,
            _ => {}
        }
        return;
    }
    for sub in &part.subparts {
        collect_bodies(sub, text, html);
    }
}

/// Run .eml files through the reconciliation engine
pub fn cmd_ingest(db: &Database, files: &[PathBuf]) -> Result<()> {
    let engine = Reconciler::new(db.clone());

    for file in files {
        let msg = match read_eml(file) {
            Ok(msg) => msg,
            Err(e) => {
                // One malformed file must not block the batch
                eprintln!("{}: skipped ({e:#})", file.display());
                continue;
            }
        };

        match engine.process_email(&msg) {
            Ok(Outcome::Matched {
                reference,
                decision,
                ..
            }) => {
                if decision.is_mismatch {
                    println!(
                        "{}: matched {} WITH MISMATCH ({})",
                        file.display(),
                        reference,
                        decision
                            .mismatch_reason
                            .as_deref()
                            .unwrap_or("unspecified"),
                    );
                } else {
                    println!("{}: matched {}", file.display(), reference);
                }
            }
            Ok(Outcome::Unmatched { reason }) => {
                println!("{}: unmatched ({})", file.display(), reason);
            }
            Ok(Outcome::Duplicate) => {
                println!("{}: duplicate, dropped", file.display());
            }
            Err(e) => {
                eprintln!("{}: processing failed ({e})", file.display());
            }
        }
    }
    Ok(())
}

/// Extract fields from an .eml without touching the store
pub fn cmd_extract(file: &Path, json: bool) -> Result<()> {
    let msg = read_eml(file)?;
    let config = MatchConfig::default();

    let Some(tx) = extract::extract_transaction(&msg, &config) else {
        println!("No payment information could be extracted");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tx)?);
        return Ok(());
    }

    println!("Extraction method : {}", opt(tx.method.map(|m| m.to_string())));
    println!("Amount            : {}", opt(tx.amount.map(|a| format!("₦{a:.2}"))));
    println!(
        "Amount source     : {}",
        opt(tx.amount_source.map(|s| s.as_str().to_string()))
    );
    println!("Sender name       : {}", opt(tx.sender_name));
    println!("Account number    : {}", opt(tx.account_number));
    println!("Payer account     : {}", opt(tx.payer_account_number));
    println!(
        "Value date        : {}",
        opt(tx.value_date.map(|d| d.to_string()))
    );
    println!(
        "Transaction time  : {}",
        opt(tx.transaction_time.map(|t| t.to_string()))
    );
    println!("Description blob  : {}", opt(tx.description_blob));
    for line in &tx.diagnostics {
        println!("  {line}");
    }
    Ok(())
}

fn opt(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Evaluate an .eml against every pending request without approving anything
pub fn cmd_recheck(db: &Database, file: &Path) -> Result<()> {
    let msg = read_eml(file)?;
    let config = MatchConfig::default();

    let Some(tx) = extract::extract_transaction(&msg, &config) else {
        println!("No payment information could be extracted");
        return Ok(());
    };
    println!(
        "Extracted: amount {}, sender {}, account {}",
        opt(tx.amount.map(|a| format!("₦{a:.2}"))),
        opt(tx.sender_name.clone()),
        opt(tx.account_number.clone()),
    );

    let pending = db.list_pending_requests()?;
    if pending.is_empty() {
        println!("No pending requests to evaluate against");
        return Ok(());
    }

    for request in pending {
        let decision = match_payment(&request, &tx, msg.received_at, &config);
        let verdict = if decision.matched {
            if decision.is_mismatch {
                "WOULD MATCH (flagged)"
            } else {
                "WOULD MATCH"
            }
        } else {
            "no match"
        };
        println!("{:<16} {:<22} {}", request.reference, verdict, decision.reason);
    }
    Ok(())
}
