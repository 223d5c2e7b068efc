//! Description-field decoder
//!
//! Several Nigerian banks embed a fixed-width numeric code in the transfer
//! narration, e.g.
//!
//! `Description : 9008771210021008599510000020260111094651392 FROM SOLOMON ...`
//!
//! At full length (43 digits) it decodes as
//! `[10 destination][10 source][6 amount-minor-units][8 value-date YYYYMMDD][9 opaque]`.
//! Shorter runs still carry the account numbers at the front. The embedded
//! amount is advisory only; an explicit "Amount : NGN ..." field always wins.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum digit-run length to qualify as a description blob
pub const MIN_BLOB_LEN: usize = 20;

fn blob_after_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)description\s*:\s*(\d{20,})").expect("invalid description blob regex")
    })
}

fn label_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)description\s*:\s*([^\n\r]+)").expect("invalid description line regex")
    })
}

fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{20,}").expect("invalid digit run regex"))
}

/// Locate the description digit run in normalized text.
///
/// Tries the strict form first (digits directly after the label), then falls
/// back to scanning the rest of the labelled logical line for the first
/// qualifying run, which copes with prefixes like `100004...-TRANSFER FROM`.
pub fn find_blob(text: &str) -> Option<String> {
    if let Some(caps) = blob_after_label_re().captures(text) {
        return Some(caps[1].to_string());
    }
    let line = label_line_re().captures(text)?;
    digit_run_re()
        .find(line.get(1)?.as_str())
        .map(|m| m.as_str().to_string())
}

/// The labelled description line, digits or not. Sender-name strategies
/// anchor on this.
pub fn find_label_line(text: &str) -> Option<String> {
    label_line_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Fields recovered from a description blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedBlob {
    /// The digit run exactly as found, kept for audit
    pub raw: String,
    /// Destination (recipient) account, always 10 digits
    pub destination: String,
    /// Source (payer) account when the run was long enough
    pub source: Option<String>,
    /// Amount in minor units (kobo); advisory, full decode only
    pub amount_minor: Option<u64>,
    /// Value date from the 8-digit field; None when not a calendar date
    pub value_date: Option<NaiveDate>,
}

impl DecodedBlob {
    /// Advisory amount in naira
    pub fn advisory_amount(&self) -> Option<f64> {
        self.amount_minor.map(|minor| minor as f64 / 100.0)
    }
}

/// Decode a digit run by its total length:
///
/// - 43: full decode
/// - 42: pad one trailing zero, decode as 43
/// - 30..=41: destination + source accounts only
/// - 20..=29: destination account only
///
/// Returns None for runs shorter than 20 or containing non-digits.
pub fn decode(blob: &str) -> Option<DecodedBlob> {
    if blob.len() < MIN_BLOB_LEN || !blob.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let raw = blob.to_string();
    let padded;
    let digits = match blob.len() {
        43 => blob,
        42 => {
            padded = format!("{}0", blob);
            &padded
        }
        _ => blob,
    };

    if digits.len() == 43 {
        let amount_minor = digits[20..26].parse::<u64>().ok();
        return Some(DecodedBlob {
            raw,
            destination: digits[..10].to_string(),
            source: Some(digits[10..20].to_string()),
            amount_minor,
            value_date: parse_value_date(&digits[26..34]),
        });
    }

    if (30..=41).contains(&digits.len()) {
        return Some(DecodedBlob {
            raw,
            destination: digits[..10].to_string(),
            source: Some(digits[10..20].to_string()),
            amount_minor: None,
            value_date: None,
        });
    }

    Some(DecodedBlob {
        raw,
        destination: digits[..10].to_string(),
        source: None,
        amount_minor: None,
        value_date: None,
    })
}

/// Convenience: locate and decode in one step
pub fn extract(text: &str) -> Option<DecodedBlob> {
    find_blob(text).as_deref().and_then(decode)
}

fn parse_value_date(yyyymmdd: &str) -> Option<NaiveDate> {
    let year: i32 = yyyymmdd[..4].parse().ok()?;
    let month: u32 = yyyymmdd[4..6].parse().ok()?;
    let day: u32 = yyyymmdd[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
