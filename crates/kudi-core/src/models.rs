//! Domain models for kudi

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound bank notification email, as handed over by an ingestion
/// collaborator (IMAP poller, webhook receiver, CLI .eml reader).
///
/// Immutable input: the engine never mutates it, only derives from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEmailMessage {
    pub subject: String,
    /// From header, display name and address as received
    pub from: String,
    pub text_body: String,
    pub html_body: String,
    /// When the message was received; Kuda-style alerts carry no time of
    /// their own, so this doubles as the transaction time for them
    pub received_at: Option<DateTime<Utc>>,
    /// Ingestion mailbox id, when the host runs several
    pub account_id: Option<i64>,
}

/// Banks with a dedicated template decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bank {
    Gtbank,
}

impl Bank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gtbank => "gtbank",
        }
    }

    /// Human-readable institution name, used in audit reasons
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gtbank => "Guaranty Trust Bank",
        }
    }
}

impl std::str::FromStr for Bank {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gtbank" | "gtb" => Ok(Self::Gtbank),
            _ => Err(format!("Unknown bank: {}", s)),
        }
    }
}

impl std::fmt::Display for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which extraction pass produced the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Dedicated bank-template decode
    Template,
    /// Plain text body
    TextBody,
    /// HTML body, table rows
    HtmlTable,
    /// HTML body, non-table patterns
    HtmlBody,
    /// HTML flattened to text, then the text patterns
    HtmlRenderedText,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::TextBody => "text_body",
            Self::HtmlTable => "html_table",
            Self::HtmlBody => "html_body",
            Self::HtmlRenderedText => "html_rendered_text",
        }
    }
}

impl std::str::FromStr for ExtractionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "template" => Ok(Self::Template),
            "text_body" => Ok(Self::TextBody),
            "html_table" => Ok(Self::HtmlTable),
            "html_body" => Ok(Self::HtmlBody),
            "html_rendered_text" => Ok(Self::HtmlRenderedText),
            _ => Err(format!("Unknown extraction method: {}", s)),
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which source produced the final amount.
///
/// The description blob embeds an amount, but it is advisory only: an
/// explicit "Amount : NGN ..." field wins when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountSource {
    /// Minor-units field of the 43-digit description blob
    DescriptionBlob,
    /// Explicit "Amount" label followed by a currency marker
    AmountLabel,
    /// Label/value table cell
    TableCell,
    /// Kuda-style sentence ("X just sent you ₦...")
    SentencePattern,
    /// Bare currency-marked literal anywhere in the text
    CurrencyLiteral,
}

impl AmountSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DescriptionBlob => "description_blob",
            Self::AmountLabel => "amount_label",
            Self::TableCell => "table_cell",
            Self::SentencePattern => "sentence_pattern",
            Self::CurrencyLiteral => "currency_literal",
        }
    }
}

/// A transaction recovered from one email.
///
/// Derived synchronously per message, never persisted on its own; the
/// attempt log snapshots the fields it needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedTransaction {
    /// Transfer amount in naira; always > 0 when present
    pub amount: Option<f64>,
    /// Normalized lower-case payer name
    pub sender_name: Option<String>,
    /// Destination (recipient) account; exactly 10 digits when derived from
    /// a full description-blob decode
    pub account_number: Option<String>,
    /// Source (payer) account when the blob carried one
    pub payer_account_number: Option<String>,
    pub value_date: Option<NaiveDate>,
    pub transaction_time: Option<NaiveTime>,
    pub method: Option<ExtractionMethod>,
    pub amount_source: Option<AmountSource>,
    /// Raw description digit run, kept verbatim for audit
    pub description_blob: Option<String>,
    /// Step-by-step notes of what each extraction pass did
    pub diagnostics: Vec<String>,
}

impl ExtractedTransaction {
    /// True when at least one field of interest was recovered
    pub fn has_any_field(&self) -> bool {
        self.amount.is_some()
            || self.sender_name.is_some()
            || self.account_number.is_some()
            || self.description_blob.is_some()
    }
}

/// Payment request lifecycle states. One-way: pending is the only
/// non-terminal state and is left at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Unknown request status: {}", s)),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An outstanding payment request awaiting a bank transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPaymentRequest {
    pub id: i64,
    /// Host-side transaction reference
    pub reference: String,
    /// Expected amount in naira
    pub amount: f64,
    /// Expected payer name; None means amount-only matching
    pub payer_name: Option<String>,
    /// Collection account the payer was shown
    pub account_number: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A payment request to be registered (before store insertion)
#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    pub reference: String,
    pub amount: f64,
    pub payer_name: Option<String>,
    pub account_number: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of comparing one extracted transaction to one pending request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDecision {
    pub matched: bool,
    /// Human-readable explanation; always populated
    pub reason: String,
    /// expected - received (positive = shortfall)
    pub amount_diff: Option<f64>,
    pub name_similarity_percent: Option<u8>,
    /// Minutes between request creation and email arrival; negative when the
    /// email predates the request
    pub time_diff_minutes: Option<i64>,
    /// Approved despite an amount outside tolerance or a low-similarity name
    pub is_mismatch: bool,
    /// Actual received amount, carried for downstream bookkeeping when
    /// `is_mismatch` is set
    pub received_amount: Option<f64>,
    pub mismatch_reason: Option<String>,
}

impl MatchDecision {
    /// An unmatched decision with only a reason
    pub fn unmatched(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            reason: reason.into(),
            amount_diff: None,
            name_similarity_percent: None,
            time_diff_minutes: None,
            is_mismatch: false,
            received_amount: None,
            mismatch_reason: None,
        }
    }
}

/// Terminal classification of one processing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Matched,
    Unmatched,
    Duplicate,
}

impl MatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Unmatched => "unmatched",
            Self::Duplicate => "duplicate",
        }
    }
}

impl std::str::FromStr for MatchResult {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "matched" => Ok(Self::Matched),
            "unmatched" => Ok(Self::Unmatched),
            "duplicate" => Ok(Self::Duplicate),
            _ => Err(format!("Unknown match result: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only audit snapshot of one match attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAttemptRecord {
    pub id: i64,
    pub request_id: Option<i64>,
    pub request_reference: Option<String>,
    pub result: MatchResult,
    pub reason: String,
    // Request context at decision time
    pub request_amount: Option<f64>,
    pub request_payer_name: Option<String>,
    pub request_account_number: Option<String>,
    pub request_created_at: Option<DateTime<Utc>>,
    // Extracted email context
    pub extracted_amount: Option<f64>,
    pub extracted_name: Option<String>,
    pub extracted_account_number: Option<String>,
    pub email_subject: Option<String>,
    pub email_from: Option<String>,
    pub email_date: Option<DateTime<Utc>>,
    // Comparison metrics
    pub amount_diff: Option<f64>,
    pub name_similarity_percent: Option<u8>,
    pub time_diff_minutes: Option<i64>,
    pub extraction_method: Option<String>,
    /// Free-form JSON context for forensics
    pub details: Option<serde_json::Value>,
    /// Truncated, UTF-8-sanitized body snippets
    pub text_snippet: Option<String>,
    pub html_snippet: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A match attempt to be recorded (before store insertion)
#[derive(Debug, Clone, Default)]
pub struct NewMatchAttempt {
    pub request_id: Option<i64>,
    pub request_reference: Option<String>,
    pub result: Option<MatchResult>,
    pub reason: String,
    pub request_amount: Option<f64>,
    pub request_payer_name: Option<String>,
    pub request_account_number: Option<String>,
    pub request_created_at: Option<DateTime<Utc>>,
    pub extracted_amount: Option<f64>,
    pub extracted_name: Option<String>,
    pub extracted_account_number: Option<String>,
    pub email_subject: Option<String>,
    pub email_from: Option<String>,
    pub email_date: Option<DateTime<Utc>>,
    pub amount_diff: Option<f64>,
    pub name_similarity_percent: Option<u8>,
    pub time_diff_minutes: Option<i64>,
    pub extraction_method: Option<String>,
    pub details: Option<serde_json::Value>,
    pub text_snippet: Option<String>,
    pub html_snippet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_round_trips_through_str() {
        assert_eq!("gtbank".parse::<Bank>().unwrap(), Bank::Gtbank);
        assert_eq!(Bank::Gtbank.to_string(), "gtbank");
    }

    #[test]
    fn request_status_parses_case_insensitively() {
        assert_eq!(
            "Pending".parse::<RequestStatus>().unwrap(),
            RequestStatus::Pending
        );
        assert!("open".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn empty_extraction_has_no_fields() {
        let tx = ExtractedTransaction::default();
        assert!(!tx.has_any_field());
    }

    #[test]
    fn extraction_with_blob_only_counts() {
        let tx = ExtractedTransaction {
            description_blob: Some("9".repeat(43)),
            ..Default::default()
        };
        assert!(tx.has_any_field());
    }
}
