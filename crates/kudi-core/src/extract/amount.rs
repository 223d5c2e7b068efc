//! Amount extraction chain
//!
//! Ranked sources for the transfer amount. Kuda-style sentence alerts come
//! first (their whole payload is one sentence), then the explicit "Amount"
//! label with a currency marker, then table cells, then any currency-marked
//! literal. The description-blob amount is only ever the fallback guess: an
//! explicit field always outranks it.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::MatchConfig;
use crate::models::AmountSource;

use super::Source;

/// Ordered amount strategies; evaluation short-circuits at the first hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountStrategy {
    /// "NAME just sent you ₦1,000" / "You just sent ₦1,000 to NAME"
    Sentence,
    /// "Amount : NGN 1,000.00" in running text
    AmountLabel,
    /// Label/value table cell
    TableCell,
    /// Bare "NGN 1,000.00" anywhere
    CurrencyLiteral,
}

const CHAIN: [AmountStrategy; 4] = [
    AmountStrategy::Sentence,
    AmountStrategy::AmountLabel,
    AmountStrategy::TableCell,
    AmountStrategy::CurrencyLiteral,
];

/// Labels other than "amount" that may carry the figure in a table row
const SECONDARY_LABELS: [&str; 5] = ["sum", "value", "total", "paid", "payment"];

fn sent_you_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)just\s+sent\s+you\s+(?:ngn|₦)\s*([\d,]+(?:\.\d+)?)")
            .expect("invalid sent-you regex")
    })
}

fn you_sent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)you\s+just\s+sent\s+(?:ngn|₦)\s*([\d,]+(?:\.\d+)?)\s+to\b")
            .expect("invalid you-sent regex")
    })
}

fn amount_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)amount\s*[:\s=]+(?:ngn|naira|₦)\s*=?\s*([\d,]+(?:\.\d+)?)")
            .expect("invalid amount label regex")
    })
}

fn secondary_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:sum|value|total|paid|payment|deposit|transfer|credit)\s*[:\s]+(?:ngn|naira|₦)\s*([\d,]+(?:\.\d+)?)",
        )
        .expect("invalid secondary label regex")
    })
}

fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:ngn|naira|₦)\s*([\d,]+(?:\.\d+)?)").expect("invalid currency regex")
    })
}

fn bare_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([\d,]+(?:\.\d+)?)$").expect("invalid bare number regex"))
}

/// Parse "1,000.50" into naira
fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok().filter(|v| *v > 0.0)
}

/// Run the amount chain over one pass, ending with the advisory blob amount.
pub(crate) fn extract(source: &Source<'_>, config: &MatchConfig) -> Option<(f64, AmountSource)> {
    let full = format!("{}\n{}", source.subject, source.body);

    let explicit = CHAIN.iter().find_map(|strategy| match strategy {
        AmountStrategy::Sentence => sent_you_re()
            .captures(&full)
            .or_else(|| you_sent_re().captures(&full))
            .and_then(|caps| parse_number(&caps[1]))
            .filter(|v| *v >= config.min_plausible_amount)
            .map(|v| (v, AmountSource::SentencePattern)),

        // The explicit label is trusted even for tiny figures; bank charges
        // can be below the plausibility floor
        AmountStrategy::AmountLabel => amount_label_re()
            .captures(&full)
            .and_then(|caps| parse_number(&caps[1]))
            .or_else(|| {
                secondary_label_re()
                    .captures(&full)
                    .and_then(|caps| parse_number(&caps[1]))
                    .filter(|v| *v >= config.min_plausible_amount)
            })
            .map(|v| (v, AmountSource::AmountLabel)),

        AmountStrategy::TableCell => from_tables(source, config).map(|v| (v, AmountSource::TableCell)),

        AmountStrategy::CurrencyLiteral => currency_re()
            .captures(&full)
            .and_then(|caps| parse_number(&caps[1]))
            .filter(|v| *v >= config.min_plausible_amount)
            .map(|v| (v, AmountSource::CurrencyLiteral)),
    });

    explicit.or_else(|| {
        source
            .blob
            .and_then(|blob| blob.advisory_amount())
            .filter(|v| *v >= config.min_plausible_amount)
            .map(|v| (v, AmountSource::DescriptionBlob))
    })
}

fn from_tables(source: &Source<'_>, config: &MatchConfig) -> Option<f64> {
    for (label, value) in source.tables {
        if label.contains("amount") {
            if let Some(v) = currency_re()
                .captures(value)
                .and_then(|caps| parse_number(&caps[1]))
            {
                return Some(v);
            }
            // An "Amount" row with a bare figure and no currency marker
            if let Some(v) = bare_number_re()
                .captures(value.trim())
                .and_then(|caps| parse_number(&caps[1]))
            {
                return Some(v);
            }
        } else if SECONDARY_LABELS.iter().any(|l| label.contains(l)) {
            if let Some(v) = currency_re()
                .captures(value)
                .and_then(|caps| parse_number(&caps[1]))
                .filter(|v| *v >= config.min_plausible_amount)
            {
                return Some(v);
            }
        }
    }
    None
}
