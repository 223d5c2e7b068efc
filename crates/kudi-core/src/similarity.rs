//! Token-overlap name similarity
//!
//! The matching heuristic for payer names. Kept as a standalone pure
//! function: the matcher, the CLI re-check command, and operator tooling all
//! call the same implementation.

/// Lower-case and collapse whitespace, the canonical form both sides of a
/// comparison are reduced to.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Percentage of expected-name tokens found in the received name.
///
/// Case-insensitive and token-order-independent. A token counts as matched
/// when it equals a received token or one is a substring of the other
/// ("amithy" matches "amithy one"). Exact string equality short-circuits to
/// 100. Either side empty scores 0.
pub fn name_similarity(expected: &str, received: &str) -> u8 {
    let expected = normalize_name(expected);
    let received = normalize_name(received);

    if expected.is_empty() || received.is_empty() {
        return 0;
    }
    if expected == received {
        return 100;
    }

    let expected_tokens: Vec<&str> = expected.split(' ').collect();
    let received_tokens: Vec<&str> = received.split(' ').collect();

    let matched = expected_tokens
        .iter()
        .filter(|token| {
            received_tokens
                .iter()
                .any(|rt| rt == *token || rt.contains(*token) || token.contains(rt))
        })
        .count();

    ((matched as f64 / expected_tokens.len() as f64) * 100.0).round() as u8
}
