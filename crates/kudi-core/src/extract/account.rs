//! Destination account-number extraction
//!
//! The description blob is the preferred source (handled by the pass
//! assembly); this chain covers the explicit "Account Number" label. NUBAN
//! account numbers are exactly 10 digits, so a 10-digit run wins outright
//! and anything else is only accepted leniently.

use std::sync::OnceLock;

use regex::Regex;

use super::Source;

fn labelled_account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)account\s*(?:number|no\.?)?\s*:\s*(\d+)")
            .expect("invalid account label regex")
    })
}

fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("invalid digit regex"))
}

/// Table labels that carry the destination account
const ACCOUNT_LABELS: [&str; 3] = ["account number", "account no", "account"];

pub(crate) fn extract(source: &Source<'_>) -> Option<String> {
    // Labelled field in running text: a NUBAN-shaped run wins, any other
    // digit run is the lenient fallback
    let mut lenient: Option<String> = None;

    if let Some(caps) = labelled_account_re().captures(source.body) {
        let run = caps[1].to_string();
        if run.len() == 10 {
            return Some(run);
        }
        lenient = Some(run);
    }

    for (label, value) in source.tables {
        if !ACCOUNT_LABELS.iter().any(|l| label == l || label.starts_with(l)) {
            continue;
        }
        for m in digit_run_re().find_iter(value) {
            let run = m.as_str().to_string();
            if run.len() == 10 {
                return Some(run);
            }
            lenient.get_or_insert(run);
        }
    }

    lenient
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source<'a>(body: &'a str, tables: &'a [(String, String)]) -> Source<'a> {
        Source {
            body,
            tables,
            subject: "",
            from: "",
            blob: None,
        }
    }

    #[test]
    fn labelled_ten_digit_number() {
        let src = source("Account Number : 9008771210", &[]);
        assert_eq!(extract(&src).as_deref(), Some("9008771210"));
    }

    #[test]
    fn lenient_run_when_not_nuban_shaped() {
        let src = source("Account Number : 12345678", &[]);
        assert_eq!(extract(&src).as_deref(), Some("12345678"));
    }

    #[test]
    fn table_cell_account() {
        let tables = vec![("account number".to_string(), "0123456789".to_string())];
        let src = source("", &tables);
        assert_eq!(extract(&src).as_deref(), Some("0123456789"));
    }

    #[test]
    fn masked_table_value_prefers_full_run() {
        let tables = vec![(
            "account number".to_string(),
            "*1210 (9008771210)".to_string(),
        )];
        let src = source("", &tables);
        assert_eq!(extract(&src).as_deref(), Some("9008771210"));
    }

    #[test]
    fn nothing_to_find() {
        let src = source("no digits with labels here", &[]);
        assert_eq!(extract(&src), None);
    }
}
