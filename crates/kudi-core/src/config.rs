//! Matching policy configuration
//!
//! Owned by the host application; the engine only consumes it. Defaults
//! mirror the production settings of the gateway this engine serves.

/// Matching policy knobs
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Maximum minutes between request creation and email arrival
    pub time_window_minutes: i64,
    /// Shortfall (expected - received) at or above which a payment is
    /// rejected even when the payer name matched
    pub large_mismatch_ceiling: f64,
    /// Rounding tolerance for "exact" amount comparison (1 kobo)
    pub amount_tolerance: f64,
    /// Extracted amounts below this are treated as reference codes, not money
    pub min_plausible_amount: f64,
    /// Token-overlap percentage at or above which names are considered matched
    pub name_similarity_threshold: u8,
    /// Trailing window for the approved-payment duplicate check
    pub duplicate_window_minutes: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            time_window_minutes: 120,
            large_mismatch_ceiling: 5000.0,
            amount_tolerance: 0.01,
            min_plausible_amount: 10.0,
            name_similarity_threshold: 65,
            duplicate_window_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_gateway_policy() {
        let config = MatchConfig::default();
        assert_eq!(config.time_window_minutes, 120);
        assert_eq!(config.large_mismatch_ceiling, 5000.0);
        assert_eq!(config.amount_tolerance, 0.01);
        assert_eq!(config.min_plausible_amount, 10.0);
        assert_eq!(config.name_similarity_threshold, 65);
        assert_eq!(config.duplicate_window_minutes, 60);
    }
}
