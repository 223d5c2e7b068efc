//! GTBank transaction-notification decoder
//!
//! GeNS notifications are a fixed table: Account Number, Amount ("NGN
//! 1,000.00"), Value Date, Description. The positions are stable enough
//! that this decoder demands all mandatory fields and refuses to guess.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::MatchConfig;
use crate::description;
use crate::error::{Error, Result};
use crate::extract::{self, EmailContent, Source};
use crate::models::{AmountSource, Bank, ExtractedTransaction, ExtractionMethod};
use crate::normalize;
use crate::similarity::normalize_name;

use super::{fingerprint, TemplateDecode};

const VALUE_DATE_FORMATS: [&str; 7] = [
    "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y", "%Y-%m-%d", "%d/%m/%y", "%d-%m-%y", "%d-%b-%Y",
];

fn value_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)value\s*date\s*:\s*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}-\d{2}-\d{2}|\d{1,2}-[A-Za-z]{3}-\d{4})")
            .expect("invalid value date regex")
    })
}

fn from_to_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bfrom\s+([A-Z][A-Z\s]+?)\s+to\b").expect("invalid from-to regex")
    })
}

fn credit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(credit|credited|deposit|received)\b").expect("invalid credit regex")
    })
}

pub(super) fn decode(content: &EmailContent, config: &MatchConfig) -> Result<TemplateDecode> {
    let bank = Bank::Gtbank;
    // One combined substrate: the decoded text body plus the flattened HTML
    let body = if content.text.is_empty() {
        content.rendered_text.clone()
    } else if content.rendered_text.is_empty() {
        content.text.clone()
    } else {
        format!("{}\n{}", content.text, content.rendered_text)
    };

    let source = Source {
        body: &body,
        tables: &content.tables,
        subject: &content.subject,
        from: &content.from,
        blob: None,
    };

    let amount = extract::amount::extract(&source, config)
        .map(|(value, _)| value)
        .ok_or_else(|| missing(bank, "amount"))?;

    let value_date = extract_value_date(&source).ok_or_else(|| missing(bank, "value date"))?;

    let blob = description::extract(&body);
    let account_number = blob
        .as_ref()
        .map(|b| b.destination.clone())
        .or_else(|| extract::account::extract(&source))
        .ok_or_else(|| missing(bank, "destination account"))?;

    let narration = narration_text(&source).unwrap_or_default();
    let sender_name = from_to_re()
        .captures(&narration)
        .map(|caps| normalize_name(&caps[1]))
        .filter(|name| name.len() >= 3);

    if !credit_re().is_match(&body) {
        // Debit alerts share the template; they are not inbound payments
        return Err(Error::BankDecode {
            bank: bank.display_name().to_string(),
            reason: "notification is not a credit".to_string(),
        });
    }

    let print = fingerprint(
        &account_number,
        amount,
        &value_date.format("%Y-%m-%d").to_string(),
        &narration,
    );

    let tx = ExtractedTransaction {
        amount: Some(amount),
        amount_source: Some(AmountSource::AmountLabel),
        sender_name,
        account_number: Some(account_number),
        payer_account_number: blob.as_ref().and_then(|b| b.source.clone()),
        value_date: Some(value_date),
        transaction_time: None,
        method: Some(ExtractionMethod::Template),
        description_blob: blob.map(|b| b.raw),
        diagnostics: vec![format!("template: decoded as {}", bank)],
    };

    Ok(TemplateDecode {
        bank,
        tx,
        narration,
        fingerprint: print,
    })
}

fn missing(bank: Bank, field: &str) -> Error {
    Error::BankDecode {
        bank: bank.display_name().to_string(),
        reason: format!("mandatory field missing: {}", field),
    }
}

fn extract_value_date(source: &Source<'_>) -> Option<NaiveDate> {
    let raw = value_date_re()
        .captures(source.body)
        .map(|caps| caps[1].to_string())
        .or_else(|| {
            source
                .tables
                .iter()
                .find(|(label, _)| label.contains("value date"))
                .map(|(_, value)| value.clone())
        })?;
    parse_date(raw.trim())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    VALUE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Full description/narration text, table cell preferred
fn narration_text(source: &Source<'_>) -> Option<String> {
    source
        .tables
        .iter()
        .find(|(label, _)| label.contains("description") || label.contains("narration"))
        .map(|(_, value)| normalize::collapse_ws(value))
        .or_else(|| description::find_label_line(source.body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawEmailMessage;

    fn gtbank_html() -> String {
        "<table>\
         <tr><td>Account Number</td><td>:</td><td>9008771210</td></tr>\
         <tr><td>Transaction Type</td><td>:</td><td>Credit</td></tr>\
         <tr><td>Amount</td><td>:</td><td>NGN 1,000.00</td></tr>\
         <tr><td>Value Date</td><td>:</td><td>11/01/2026</td></tr>\
         <tr><td>Description</td><td>:</td><td>FROM SOLOMON INNOCENT AMITHY TO SQUAD</td></tr>\
         </table>"
            .to_string()
    }

    fn content(html: &str, text: &str) -> EmailContent {
        EmailContent::from_message(&RawEmailMessage {
            subject: "GeNS Transaction Notification".to_string(),
            from: "GeNS <gens@gtbank.com>".to_string(),
            text_body: text.to_string(),
            html_body: html.to_string(),
            received_at: None,
            account_id: None,
        })
    }

    #[test]
    fn decodes_a_complete_notification() {
        let decoded = decode(&content(&gtbank_html(), ""), &MatchConfig::default()).unwrap();
        assert_eq!(decoded.bank, Bank::Gtbank);
        assert_eq!(decoded.tx.amount, Some(1000.0));
        assert_eq!(decoded.tx.account_number.as_deref(), Some("9008771210"));
        assert_eq!(
            decoded.tx.value_date,
            NaiveDate::from_ymd_opt(2026, 1, 11)
        );
        assert_eq!(
            decoded.tx.sender_name.as_deref(),
            Some("solomon innocent amithy")
        );
        assert_eq!(decoded.tx.method, Some(ExtractionMethod::Template));
        assert_eq!(decoded.fingerprint.len(), 64);
    }

    #[test]
    fn text_only_notification_decodes_too() {
        let text = "Transaction Notification\n\
            Account Number : 9008771210\n\
            Amount : NGN 250.00\n\
            Value Date : 11/01/2026\n\
            Description : 9008771210021008599510000020260111094651392 FROM SOLOMON INNOCENT AMITHY TO SQUAD\n\
            Transaction was a credit";
        let decoded = decode(&content("", text), &MatchConfig::default()).unwrap();
        assert_eq!(decoded.tx.amount, Some(250.0));
        assert_eq!(decoded.tx.account_number.as_deref(), Some("9008771210"));
        assert_eq!(
            decoded.tx.payer_account_number.as_deref(),
            Some("0210085995")
        );
    }

    #[test]
    fn missing_value_date_is_a_hard_failure() {
        let html = "<table>\
         <tr><td>Account Number</td><td>:</td><td>9008771210</td></tr>\
         <tr><td>Amount</td><td>:</td><td>NGN 1,000.00</td></tr>\
         <tr><td>Description</td><td>:</td><td>Credit FROM A B TO C</td></tr>\
         </table>";
        let err = decode(&content(html, ""), &MatchConfig::default()).unwrap_err();
        match err {
            Error::BankDecode { reason, .. } => assert!(reason.contains("value date")),
            other => panic!("expected BankDecode, got {other:?}"),
        }
    }

    #[test]
    fn missing_amount_is_a_hard_failure() {
        let html = "<table>\
         <tr><td>Account Number</td><td>:</td><td>9008771210</td></tr>\
         <tr><td>Value Date</td><td>:</td><td>11/01/2026</td></tr>\
         </table>";
        let err = decode(&content(html, ""), &MatchConfig::default()).unwrap_err();
        match err {
            Error::BankDecode { reason, .. } => assert!(reason.contains("amount")),
            other => panic!("expected BankDecode, got {other:?}"),
        }
    }

    #[test]
    fn debit_notifications_are_refused() {
        let html = "<table>\
         <tr><td>Account Number</td><td>:</td><td>9008771210</td></tr>\
         <tr><td>Transaction Type</td><td>:</td><td>Debit</td></tr>\
         <tr><td>Amount</td><td>:</td><td>NGN 1,000.00</td></tr>\
         <tr><td>Value Date</td><td>:</td><td>11/01/2026</td></tr>\
         <tr><td>Description</td><td>:</td><td>airtime purchase</td></tr>\
         </table>";
        assert!(decode(&content(html, ""), &MatchConfig::default()).is_err());
    }
}
