//! Engine settings loaded from environment variables.
//!
//! Every setting is optional; unset or unparsable values fall back to defaults so a
//! bare `.env` still yields a working engine.

use std::time::Duration;
use tracing::warn;

/// Tunables for the settlement coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Attempts per atomic command before surfacing `TransactionConflict`
    pub max_attempts: u32,
    /// Base backoff between attempts; attempt `n` waits `n * retry_backoff`
    pub retry_backoff: Duration,
    /// Prefix for human-readable bill numbers
    pub bill_number_prefix: String,
    /// Bill total that earns one loyalty point
    pub loyalty_points_unit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(25),
            bill_number_prefix: "BILL".to_string(),
            loyalty_points_unit: 1000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    raw.trim().parse().map_or_else(
        |_| {
            warn!(key, value = %raw, "Ignoring unparsable setting");
            None
        },
        Some,
    )
}

impl EngineSettings {
    /// Reads `SETTLEMENT_MAX_ATTEMPTS`, `SETTLEMENT_RETRY_BACKOFF_MS`,
    /// `BILL_NUMBER_PREFIX` and `LOYALTY_POINTS_UNIT`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_attempts: env_parse::<u32>("SETTLEMENT_MAX_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
            retry_backoff: env_parse::<u64>("SETTLEMENT_RETRY_BACKOFF_MS")
                .map_or(defaults.retry_backoff, Duration::from_millis),
            bill_number_prefix: std::env::var("BILL_NUMBER_PREFIX")
                .ok()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or(defaults.bill_number_prefix),
            loyalty_points_unit: env_parse::<u32>("LOYALTY_POINTS_UNIT")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.loyalty_points_unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.bill_number_prefix, "BILL");
        assert_eq!(settings.loyalty_points_unit, 1000);
    }

    #[test]
    fn test_from_env_falls_back_to_defaults() {
        // These keys are not set in the test environment
        let settings = EngineSettings::from_env();
        assert!(settings.max_attempts > 0);
        assert!(settings.loyalty_points_unit > 0);
        assert!(!settings.bill_number_prefix.is_empty());
    }
}
