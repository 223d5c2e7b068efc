//! Bank-template recognition
//!
//! Known banks are recognized by sender-domain suffix plus a content
//! fingerprint phrase, and get a dedicated field-position decoder that runs
//! ahead of generic extraction. Precision beats recall here: when a
//! recognized bank's decoder cannot produce every mandatory field, the email
//! is a hard parse failure rather than a candidate for low-confidence
//! generic heuristics.

mod gtbank;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::extract::EmailContent;
use crate::models::{Bank, ExtractedTransaction};

/// Recognition entry for one bank
#[derive(Debug, Clone)]
pub struct BankTemplate {
    pub bank: Bank,
    /// Sender address must end with this domain
    pub domain_suffix: &'static str,
    /// Phrase that must appear in the subject or either body
    pub fingerprint_phrase: &'static str,
}

/// A successfully decoded bank notification
#[derive(Debug, Clone)]
pub struct TemplateDecode {
    pub bank: Bank,
    pub tx: ExtractedTransaction,
    /// Full narration text, as carried into the fingerprint
    pub narration: String,
    /// Deterministic re-ingestion suppression key
    pub fingerprint: String,
}

/// The set of banks with dedicated decoders
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<BankTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateRegistry {
    /// Registry of the banks shipped with the engine
    pub fn builtin() -> Self {
        Self {
            templates: vec![BankTemplate {
                bank: Bank::Gtbank,
                domain_suffix: "@gtbank.com",
                fingerprint_phrase: "transaction notification",
            }],
        }
    }

    pub fn templates(&self) -> &[BankTemplate] {
        &self.templates
    }

    /// Recognize the sending bank, if any
    pub fn recognize(&self, content: &EmailContent) -> Option<Bank> {
        let from = content.from.to_lowercase();
        let haystacks = [
            content.subject.to_lowercase(),
            content.text.to_lowercase(),
            content.rendered_text.to_lowercase(),
        ];

        self.templates
            .iter()
            .find(|t| {
                domain_matches(&from, t.domain_suffix)
                    && haystacks.iter().any(|h| h.contains(t.fingerprint_phrase))
            })
            .map(|t| {
                debug!(bank = %t.bank, "recognized bank template");
                t.bank
            })
    }
}

fn domain_matches(from: &str, suffix: &str) -> bool {
    // The suffix must terminate the address part: "gens@gtbank.com" or
    // "GeNS <gens@gtbank.com>"
    from.split_whitespace()
        .map(|part| part.trim_matches(|c| c == '<' || c == '>'))
        .any(|part| part.ends_with(suffix))
        || from.contains(&format!("{}>", suffix))
        || from.ends_with(suffix)
}

/// Run the dedicated decoder for a recognized bank.
///
/// Errors with [`crate::Error::BankDecode`] when any mandatory field
/// (amount, value date, destination account) is missing.
pub fn decode(bank: Bank, content: &EmailContent, config: &MatchConfig) -> Result<TemplateDecode> {
    match bank {
        Bank::Gtbank => gtbank::decode(content, config),
    }
}

/// Deterministic fingerprint over the fields that identify one bank
/// transaction, used to suppress re-ingestion of the same alert.
pub fn fingerprint(account: &str, amount: f64, value_date: &str, narration: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(value_date.as_bytes());
    hasher.update(narration.as_bytes());
    hex::encode(hasher.finalize())
}
