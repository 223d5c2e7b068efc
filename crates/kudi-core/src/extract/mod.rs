//! Multi-strategy field extraction
//!
//! One pipeline, three passes over progressively worse material: the decoded
//! plain-text body, the HTML body (table rows first), and finally the HTML
//! flattened to text. Within a pass each field runs an ordered chain of
//! strategy variants sharing one `apply` contract; the first candidate that
//! survives validity filtering wins and lower strategies are not evaluated.

pub mod account;
pub mod amount;
pub mod sender;

use std::sync::OnceLock;

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use tracing::debug;

use crate::config::MatchConfig;
use crate::description::{self, DecodedBlob};
use crate::models::{AmountSource, ExtractedTransaction, ExtractionMethod, RawEmailMessage};
use crate::normalize;

/// Normalized material extracted once per email and shared by every strategy
#[derive(Debug, Clone)]
pub struct EmailContent {
    pub subject: String,
    pub from: String,
    /// Transport-decoded, cleaned plain-text body
    pub text: String,
    /// Transport-decoded HTML body, markup intact
    pub html: String,
    /// HTML flattened to canonical text
    pub rendered_text: String,
    /// Label/value pairs from the HTML table rows
    pub tables: Vec<(String, String)>,
}

impl EmailContent {
    pub fn from_message(msg: &RawEmailMessage) -> Self {
        let text = normalize::clean_text(&normalize::decode_transport(&msg.text_body));
        let html = normalize::decode_transport(&msg.html_body);
        let (rendered_text, tables) = if html.trim().is_empty() {
            (String::new(), Vec::new())
        } else {
            (normalize::html_to_text(&html), normalize::table_fields(&html))
        };
        Self {
            subject: msg.subject.clone(),
            from: msg.from.to_lowercase(),
            text,
            html,
            rendered_text,
            tables,
        }
    }
}

/// The material one extraction pass works on
pub(crate) struct Source<'a> {
    /// Body text for this pass
    pub body: &'a str,
    /// Table rows; populated for the HTML pass only
    pub tables: &'a [(String, String)],
    pub subject: &'a str,
    pub from: &'a str,
    /// Decoded description blob, when one was found anywhere in the email
    pub blob: Option<&'a DecodedBlob>,
}

impl Source<'_> {
    /// The labelled description line of this pass's body
    pub fn description_line(&self) -> Option<String> {
        description::find_label_line(self.body)
    }
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:transaction\s*time|time)\s*:\s*(\d{1,2}):(\d{2}):(\d{2})\s*(AM|PM)")
            .expect("invalid time regex")
    })
}

/// Extract the transaction time from a "Time : 09:46:51 AM" style field,
/// checking the pass body first, then the table rows
fn extract_time(source: &Source<'_>) -> Option<NaiveTime> {
    if let Some(time) = parse_time_text(source.body) {
        return Some(time);
    }
    source
        .tables
        .iter()
        .filter(|(label, _)| label.contains("time"))
        .find_map(|(label, value)| parse_time_text(&format!("{} : {}", label, value)))
}

fn parse_time_text(body: &str) -> Option<NaiveTime> {
    let caps = time_re().captures(body)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps[3].parse().ok()?;
    match caps[4].to_ascii_uppercase().as_str() {
        "PM" if hour < 12 => hour += 12,
        "AM" if hour == 12 => hour = 0,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Run the full extraction pipeline over one email.
///
/// Returns None only when no field at all could be recovered; a transaction
/// missing its amount is still returned so the attempt log can explain what
/// was (and was not) found.
pub fn extract_transaction(
    msg: &RawEmailMessage,
    config: &MatchConfig,
) -> Option<ExtractedTransaction> {
    let content = EmailContent::from_message(msg);

    // The blob is hunted across every substrate up front; transports differ
    // in which body carries it intact.
    let blob = description::extract(&content.text)
        .or_else(|| description::extract(&content.rendered_text));

    let passes: [(ExtractionMethod, &str, &[(String, String)]); 3] = [
        (ExtractionMethod::TextBody, &content.text, &[]),
        (ExtractionMethod::HtmlTable, "", &content.tables),
        (ExtractionMethod::HtmlRenderedText, &content.rendered_text, &[]),
    ];

    let mut best: Option<ExtractedTransaction> = None;
    let mut diagnostics = Vec::new();

    for (method, body, tables) in passes {
        if body.trim().is_empty() && tables.is_empty() {
            diagnostics.push(format!("{}: body empty, skipped", method));
            continue;
        }
        let source = Source {
            body,
            tables,
            subject: &content.subject,
            from: &content.from,
            blob: blob.as_ref(),
        };

        let mut tx = extract_pass(&source, config);
        tx.method = Some(method);

        match tx.amount {
            Some(amount) => {
                diagnostics.push(format!(
                    "{}: amount {:.2} via {}",
                    method,
                    amount,
                    tx.amount_source.map(|s| s.as_str()).unwrap_or("unknown")
                ));
                tx.diagnostics = diagnostics;
                finalize(&mut tx, msg);
                return Some(tx);
            }
            None => {
                diagnostics.push(format!("{}: no amount", method));
                // Keep the first pass that recovered anything, as fallback
                if best.is_none() && tx.has_any_field() {
                    best = Some(tx);
                }
            }
        }
    }

    let mut tx = best?;
    tx.diagnostics = diagnostics;
    finalize(&mut tx, msg);
    debug!(
        account = tx.account_number.as_deref().unwrap_or("-"),
        sender = tx.sender_name.as_deref().unwrap_or("-"),
        "extraction recovered fields but no amount"
    );
    Some(tx)
}

/// One pass: every field chain over one source
fn extract_pass(source: &Source<'_>, config: &MatchConfig) -> ExtractedTransaction {
    let amount = amount::extract(source, config);
    let sender_name = sender::extract(source);
    let account_number = account::extract(source);

    let mut tx = ExtractedTransaction {
        amount: amount.map(|(value, _)| value),
        amount_source: amount.map(|(_, src)| src),
        sender_name,
        account_number,
        transaction_time: extract_time(source),
        ..Default::default()
    };

    if let Some(blob) = source.blob {
        tx.description_blob = Some(blob.raw.clone());
        tx.value_date = blob.value_date;
        // Blob accounts take precedence over labelled ones; they are the
        // positional source the rest of the narration hangs off
        if blob.destination.len() == 10 {
            tx.account_number = Some(blob.destination.clone());
        }
        if tx.payer_account_number.is_none() {
            tx.payer_account_number = blob.source.clone();
        }
    }

    tx
}

/// Backfill fields only the enclosing message can supply
fn finalize(tx: &mut ExtractedTransaction, msg: &RawEmailMessage) {
    // Kuda-style alerts carry no time of their own; the received timestamp
    // stands in
    if tx.transaction_time.is_none() && tx.amount_source == Some(AmountSource::SentencePattern) {
        if let Some(received) = msg.received_at {
            let t = received.time();
            tx.transaction_time = NaiveTime::from_hms_opt(t.hour(), t.minute(), t.second());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn message(text: &str, html: &str) -> RawEmailMessage {
        RawEmailMessage {
            subject: "GeNS Transaction Notification".to_string(),
            from: "GeNS <gens@gtbank.com>".to_string(),
            text_body: text.to_string(),
            html_body: html.to_string(),
            received_at: Some(Utc.with_ymd_and_hms(2026, 1, 11, 9, 50, 0).unwrap()),
            account_id: None,
        }
    }

    #[test]
    fn text_body_wins_when_it_carries_the_amount() {
        let msg = message(
            "Amount : NGN 1,000.00\nDescription : 9008771210021008599510000020260111094651392 FROM SOLOMON INNOCENT AMITHY TO SQUAD",
            "",
        );
        let tx = extract_transaction(&msg, &MatchConfig::default()).unwrap();
        assert_eq!(tx.amount, Some(1000.0));
        assert_eq!(tx.amount_source, Some(AmountSource::AmountLabel));
        assert_eq!(tx.method, Some(ExtractionMethod::TextBody));
        assert_eq!(tx.account_number.as_deref(), Some("9008771210"));
        assert_eq!(tx.payer_account_number.as_deref(), Some("0210085995"));
        assert_eq!(tx.sender_name.as_deref(), Some("solomon innocent amithy"));
        assert_eq!(tx.value_date, NaiveDate::from_ymd_opt(2026, 1, 11));
        assert!(tx.description_blob.is_some());
    }

    #[test]
    fn priority_one_description_strategy_drives_scenario() {
        // Blob and FROM <NAME> TO <dest> in one narration line
        let msg = message(
            "Description : 9008771210021008599510000020260111094651392 FROM SOLOMON INNOCENT AMITHY TO SQUAD\nAmount : NGN 250.00",
            "",
        );
        let tx = extract_transaction(&msg, &MatchConfig::default()).unwrap();
        assert_eq!(tx.account_number.as_deref(), Some("9008771210"));
        assert_eq!(tx.sender_name.as_deref(), Some("solomon innocent amithy"));
    }

    #[test]
    fn html_table_pass_runs_when_text_is_empty() {
        let html = "<table>\
            <tr><td>Amount</td><td>:</td><td>NGN 5,000.00</td></tr>\
            <tr><td>Description</td><td>:</td><td>FROM JOHN AGBO TO SHOP</td></tr>\
            <tr><td>Account Number</td><td>:</td><td>0123456789</td></tr>\
            </table>";
        let msg = message("", html);
        let tx = extract_transaction(&msg, &MatchConfig::default()).unwrap();
        assert_eq!(tx.amount, Some(5000.0));
        assert_eq!(tx.method, Some(ExtractionMethod::HtmlTable));
        assert_eq!(tx.sender_name.as_deref(), Some("john agbo"));
        assert_eq!(tx.account_number.as_deref(), Some("0123456789"));
    }

    #[test]
    fn no_field_at_all_yields_none() {
        let msg = message("Nothing of interest here.", "");
        assert!(extract_transaction(&msg, &MatchConfig::default()).is_none());
    }

    #[test]
    fn fields_without_amount_still_surface() {
        let msg = message(
            "Description : 90087712100210085995 something unrelated",
            "",
        );
        let tx = extract_transaction(&msg, &MatchConfig::default()).unwrap();
        assert_eq!(tx.amount, None);
        assert_eq!(tx.account_number.as_deref(), Some("9008771210"));
    }

    #[test]
    fn twelve_hour_time_converts() {
        let msg = message("Amount : NGN 100.00\nTime : 02:15:30 PM", "");
        let tx = extract_transaction(&msg, &MatchConfig::default()).unwrap();
        assert_eq!(tx.transaction_time, NaiveTime::from_hms_opt(14, 15, 30));
    }

    #[test]
    fn sentence_amount_borrows_received_time() {
        let msg = message("MARY JANE OKAFOR just sent you ₦4,500.00", "");
        let tx = extract_transaction(&msg, &MatchConfig::default()).unwrap();
        assert_eq!(tx.amount, Some(4500.0));
        assert_eq!(tx.amount_source, Some(AmountSource::SentencePattern));
        assert_eq!(tx.sender_name.as_deref(), Some("mary jane okafor"));
        assert_eq!(tx.transaction_time, NaiveTime::from_hms_opt(9, 50, 0));
    }
}
