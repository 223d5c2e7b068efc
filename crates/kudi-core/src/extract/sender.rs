//! Sender-name extraction chain
//!
//! Payer names hide in the narration in a dozen bank-specific shapes. The
//! chain below runs them in reliability order; the description-field
//! strategies sit on the same positional anchor as the amount decode, which
//! is what makes them trustworthy. Everything that falls out is cleaned,
//! validated against a boilerplate stoplist, and lower-cased.

use std::sync::OnceLock;

use regex::Regex;

use crate::similarity::normalize_name;

use super::Source;

/// Ordered sender-name strategies; first valid candidate wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SenderStrategy {
    /// Kuda-style sentence alerts
    Sentence,
    /// `<digits> FROM <NAME>` on the description line
    DescriptionDigitsFrom,
    /// `TRANSFER FROM <NAME>` (colon/equals variants, `-OPAY` style tags)
    DescriptionTransferFrom,
    /// `-KMB-<NAME>` / `-BIG-KMB-<NAME>` narration tails
    DescriptionKmb,
    /// `FROM <NAME> TO <RECIPIENT>` anywhere in the body
    FromToAnywhere,
    /// `<code>-<NAME> TRF FOR ...`
    CodeNameTrf,
    /// Remarks/Narration label, honorific prefixes stripped
    RemarksLabel,
    /// Label/value table cells
    TableCells,
    /// `received from <NAME>` / `FROM OPAY/<NAME>` wallet formats
    ReceivedFrom,
    /// Bare `FROM <NAME>` fallback
    GenericFrom,
    /// From-header display name, last resort
    DisplayName,
}

const CHAIN: [SenderStrategy; 11] = [
    SenderStrategy::Sentence,
    SenderStrategy::DescriptionDigitsFrom,
    SenderStrategy::DescriptionTransferFrom,
    SenderStrategy::DescriptionKmb,
    SenderStrategy::FromToAnywhere,
    SenderStrategy::CodeNameTrf,
    SenderStrategy::RemarksLabel,
    SenderStrategy::TableCells,
    SenderStrategy::ReceivedFrom,
    SenderStrategy::GenericFrom,
    SenderStrategy::DisplayName,
];

/// Words that mark a candidate as template boilerplate rather than a name
const STOPLIST: [&str; 52] = [
    "thank", "you", "for", "choosing", "important", "us", "if", "would", "prefer", "that", "we",
    "do", "not", "display", "your", "account", "balance", "in", "every", "transaction", "alert",
    "sent", "to", "via", "email", "please", "dial", "privacy", "security", "bank", "details", "is",
    "are", "as", "follows", "current", "available", "value", "date", "time", "document", "number",
    "location", "notification", "guaranty", "trust", "electronic", "service", "gens", "wish",
    "inform", "occurred",
];

fn notification_sent_you_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Transaction\s+Notification\s+([A-Z][A-Z\s]{2,}?)\s+just\s+sent\s+you")
            .expect("invalid notification sentence regex")
    })
}

fn sent_you_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([A-Z][A-Z\s]{2,}?)\s+just\s+sent\s+you\s+(?:ngn|₦)")
            .expect("invalid sent-you name regex")
    })
}

fn you_sent_to_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)you\s+just\s+sent\s+(?:ngn|₦)\s*[\d,.]+\s+to\s+([A-Z][A-Z\s\-]{2,}?)(?:\s*$|[.,])")
            .expect("invalid you-sent-to regex")
    })
}

fn digits_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\d{20,}\s+FROM\s*[:=]?\s*([A-Z][A-Z\s=]{2,}?)(?:\s+TO\b|\s*-|$)")
            .expect("invalid digits-from regex")
    })
}

fn transfer_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)TRANSFER\s*=?\s*FROM\s*[:=]?\s*([A-Z][A-Z\s=]{2,}?)(?:\s+TO\b|\s*-|$)")
            .expect("invalid transfer-from regex")
    })
}

fn kmb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)-(?:BIG-)?KMB-([A-Z][A-Z\s,]{2,}?)(?:\s*\.|\s+Amount\b|\s+Value\b|$)")
            .expect("invalid kmb regex")
    })
}

fn from_to_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bFROM\s+([A-Z][A-Z\s]{2,}?)\s+TO\s+[A-Z0-9]")
            .expect("invalid from-to regex")
    })
}

fn code_name_trf_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[\d\-]+\s*-\s*([A-Z][A-Z\s]{2,}?)\s+(?:TRF|TRANSFER|FOR|TO)\b")
            .expect("invalid code-name regex")
    })
}

fn remarks_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:remarks?|narration)\s*:\s*([^\n\r]+)")
            .expect("invalid remarks regex")
    })
}

fn remarks_terminator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s+(?:Time|Transaction|Amount|Value)\b.*$")
            .expect("invalid remarks terminator regex")
    })
}

fn received_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:FROM\s+OPAY/|received\s+from\s+)\s*([A-Z][A-Z\s\-]{2,}?)(?:-Support\b|\s*[|/.]|\s*$)")
            .expect("invalid received-from regex")
    })
}

fn generic_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bFROM\s+([A-Z][A-Z\s]{2,}?)(?:\s+TO\b|\s*-|\s*$|[.,])")
            .expect("invalid generic-from regex")
    })
}

fn labelled_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:sender|payer|depositor|account\s*name)\s*:\s*([A-Z][A-Z\s]{2,}?)(?:\s+to\b|\s+account\b|\s*:|\s*$|[.,])")
            .expect("invalid labelled-name regex")
    })
}

fn honorific_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:NT|MR|MRS|MS|DR|PROF|ENG|CHIEF|ALHAJI|ALHAJA|MALLAM|MALAM)\s+")
            .expect("invalid honorific regex")
    })
}

fn long_digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{10,}").expect("invalid digit run regex"))
}

/// Table labels whose values are narration text
const NARRATION_LABELS: [&str; 4] = ["description", "remarks", "details", "narration"];
/// Table labels whose values are the name itself
const NAME_LABELS: [&str; 5] = ["from", "sender", "payer", "depositor", "account name"];

pub(crate) fn extract(source: &Source<'_>) -> Option<String> {
    CHAIN
        .iter()
        .find_map(|strategy| apply(*strategy, source).and_then(validate))
}

fn apply(strategy: SenderStrategy, source: &Source<'_>) -> Option<String> {
    let body = source.body;
    match strategy {
        SenderStrategy::Sentence => notification_sent_you_re()
            .captures(body)
            .or_else(|| sent_you_name_re().captures(body))
            .or_else(|| you_sent_to_re().captures(body))
            .map(|caps| caps[1].to_string()),

        SenderStrategy::DescriptionDigitsFrom => {
            let line = source.description_line()?;
            digits_from_re().captures(&line).map(|caps| caps[1].to_string())
        }

        SenderStrategy::DescriptionTransferFrom => {
            let line = source.description_line()?;
            transfer_from_re().captures(&line).map(|caps| caps[1].to_string())
        }

        SenderStrategy::DescriptionKmb => {
            let line = source.description_line()?;
            kmb_re().captures(&line).map(|caps| caps[1].to_string())
        }

        SenderStrategy::FromToAnywhere => {
            from_to_re().captures(body).map(|caps| caps[1].to_string())
        }

        SenderStrategy::CodeNameTrf => {
            code_name_trf_re().captures(body).map(|caps| caps[1].to_string())
        }

        SenderStrategy::RemarksLabel => {
            let line = remarks_line_re().captures(body)?[1].trim().to_string();
            Some(from_narration_line(&line))
        }

        SenderStrategy::TableCells => source.tables.iter().find_map(|(label, value)| {
            if NARRATION_LABELS.iter().any(|l| label.contains(l)) {
                from_narration_cell(value)
            } else if NAME_LABELS.iter().any(|l| label == l) {
                Some(value.clone())
            } else {
                None
            }
        }),

        SenderStrategy::ReceivedFrom => {
            received_from_re().captures(body).map(|caps| caps[1].to_string())
        }

        SenderStrategy::GenericFrom => generic_from_re()
            .captures(body)
            .or_else(|| labelled_name_re().captures(body))
            .map(|caps| caps[1].to_string()),

        SenderStrategy::DisplayName => {
            let display = source.from.split('<').next()?.trim();
            if display.is_empty() {
                None
            } else {
                Some(display.to_string())
            }
        }
    }
}

/// Run the narration sub-ladder over one table-cell value
fn from_narration_cell(value: &str) -> Option<String> {
    digits_from_re()
        .captures(value)
        .or_else(|| transfer_from_re().captures(value))
        .or_else(|| kmb_re().captures(value))
        .or_else(|| from_to_re().captures(value))
        .or_else(|| code_name_trf_re().captures(value))
        .map(|caps| caps[1].to_string())
        .or_else(|| {
            // A remarks-style cell may hold nothing but the name
            if value.contains(':') || value.chars().any(|c| c.is_ascii_digit()) {
                None
            } else {
                Some(from_narration_line(value))
            }
        })
}

/// Remarks lines carry the name after the last dash tag, e.g.
/// "4-UBA-SOLO MON FEMI GARBA" or "D-FAIRMONE Y-JOHN AGBO"
fn from_narration_line(line: &str) -> String {
    let trimmed = remarks_terminator_re().replace(line, "");
    match trimmed.rsplit_once('-') {
        Some((_, tail)) => tail.trim().to_string(),
        None => trimmed.trim().to_string(),
    }
}

/// Clean a raw candidate: soft-break artifacts, honorifics, trailing
/// punctuation; then lower-case and collapse whitespace.
fn clean(raw: &str) -> String {
    let no_equals = raw.replace('=', " ");
    let trimmed = no_equals
        .trim()
        .trim_end_matches(|c: char| c == '-' || c == '.' || c == ',' || c == ';' || c == ':' || c.is_whitespace());
    let without_honorific = honorific_re().replace(trimmed, "");
    normalize_name(&without_honorific)
}

/// Validity filter applied to every candidate before it can win
fn validate(raw: String) -> Option<String> {
    let name = clean(&raw);

    if name.len() < 3 || !name.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    if name.contains('@') || name.contains("http") || name.contains("www.") {
        return None;
    }
    if name.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        return None;
    }
    if long_digit_run_re().is_match(&name) {
        return None;
    }
    // Single letter, or initials only ("J A")
    let tokens: Vec<&str> = name.split(' ').collect();
    if tokens.iter().all(|t| t.len() <= 1) {
        return None;
    }
    // All tokens boilerplate means no name survived
    let substantive = tokens
        .iter()
        .filter(|t| t.len() >= 2 && !STOPLIST.contains(&t.to_lowercase().as_str()))
        .count();
    if substantive == 0 {
        return None;
    }

    Some(name)
}
