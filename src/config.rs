//! Configuration for the record store and the booking engine
//!
//! Both structs carry working defaults. Values supplied from the command line go
//! through the `new` constructors, which replace unusable zeros with the defaults
//! and log a warning instead of failing.

use chrono::Duration;
use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use crate::types::CREDIT_TYPE;

/// Record store tuning
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Total attempts for one record update, the first one included
    pub max_attempts: u32,
    /// Backoff ceiling before the first retry; doubles with every attempt
    pub base_delay: StdDuration,
    /// Upper bound on in-flight updates during a bulk update
    pub bulk_concurrency: usize,
    /// Records per page for scans and index queries
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: StdDuration::from_millis(100),
            bulk_concurrency: 20,
            page_size: 100,
        }
    }
}

impl StoreConfig {
    /// Create a StoreConfig with custom retry and concurrency limits
    pub fn new(max_attempts: u32, bulk_concurrency: usize) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            tracing::warn!(
                max_attempts,
                default = default.max_attempts,
                "invalid max_attempts, using default"
            );
            default.max_attempts
        } else {
            max_attempts
        };

        let bulk_concurrency = if bulk_concurrency == 0 {
            tracing::warn!(
                bulk_concurrency,
                default = default.bulk_concurrency,
                "invalid bulk_concurrency, using default"
            );
            default.bulk_concurrency
        } else {
            bulk_concurrency
        };

        Self {
            max_attempts,
            bulk_concurrency,
            ..default
        }
    }
}

/// Longest roster horizon accepted from the command line, in days
pub const MAX_SUMMARY_DAYS: i64 = 366;

/// Booking engine rules and windows
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Payment is due this long before the session starts
    pub pay_by_grace: Duration,
    /// No reminder within this long of the request being made
    pub reminder_grace: Duration,
    /// Largest accepted fuzzy match distance
    pub match_threshold: usize,
    /// Credits older than this are not considered by reconciliation
    pub transaction_lookback: Duration,
    /// Settled submissions with sessions inside this window count as claimed
    pub paid_lookback: Duration,
    /// How far back missing-submission recovery asks the form provider
    pub missing_lookback: Duration,
    /// Records are marked for garbage collection this long after their date
    pub record_retention: Duration,
    /// Days ahead, counted from the start of today, covered by session rosters
    pub summary_days: i64,
    /// Hour of day (UTC) at which the hourly pass sends session rosters
    pub summary_hour: u32,
    /// Day of month on which the hourly pass sends the transactions summary
    pub transactions_summary_day: u32,
    /// Hour of day (UTC) at which the hourly pass sends the transactions summary
    pub transactions_summary_hour: u32,
    /// Calendar months covered by the transactions summary
    pub transactions_summary_months: u32,
    /// Bank type codes listed in the transactions summary
    pub summary_type_codes: Vec<String>,
    /// Short venue names used in the transactions summary
    pub venue_codes: BTreeMap<String, String>,
    /// Bank type code of incoming payments
    pub credit_type: String,
    /// Operator mailbox for alerts and rosters
    pub operator_address: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pay_by_grace: Duration::hours(48),
            reminder_grace: Duration::hours(1),
            match_threshold: 2,
            transaction_lookback: Duration::days(30),
            paid_lookback: Duration::days(90),
            missing_lookback: Duration::hours(4),
            record_retention: Duration::days(365),
            summary_days: 3,
            summary_hour: 12,
            transactions_summary_day: 5,
            transactions_summary_hour: 10,
            transactions_summary_months: 2,
            summary_type_codes: ["CR", "BP", "VIS", "CHG", "DD"]
                .iter()
                .map(|code| code.to_string())
                .collect(),
            venue_codes: BTreeMap::from([
                ("West Wilts".to_string(), "WWEC".to_string()),
                ("Widbrook".to_string(), "WID".to_string()),
            ]),
            credit_type: CREDIT_TYPE.to_string(),
            operator_address: "bookings@localhost".to_string(),
        }
    }
}

impl EngineConfig {
    /// Default rules with a specific operator mailbox
    pub fn with_operator(operator_address: &str) -> Self {
        let default = Self::default();
        if operator_address.trim().is_empty() {
            tracing::warn!(
                default = %default.operator_address,
                "empty operator address, using default"
            );
            return default;
        }
        Self {
            operator_address: operator_address.to_string(),
            ..default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_store_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.bulk_concurrency, 20);
        assert_eq!(config.base_delay, StdDuration::from_millis(100));
    }

    #[rstest]
    #[case::custom(3, 8, 3, 8)]
    #[case::zero_attempts(0, 8, 5, 8)]
    #[case::zero_concurrency(3, 0, 3, 20)]
    #[case::all_zero(0, 0, 5, 20)]
    fn test_store_config_new(
        #[case] attempts: u32,
        #[case] concurrency: usize,
        #[case] expected_attempts: u32,
        #[case] expected_concurrency: usize,
    ) {
        let config = StoreConfig::new(attempts, concurrency);
        assert_eq!(config.max_attempts, expected_attempts);
        assert_eq!(config.bulk_concurrency, expected_concurrency);
    }

    #[rstest]
    #[case::custom("ops@club.example", "ops@club.example")]
    #[case::blank("  ", "bookings@localhost")]
    fn test_with_operator(#[case] address: &str, #[case] expected: &str) {
        let config = EngineConfig::with_operator(address);
        assert_eq!(config.operator_address, expected);
        assert_eq!(config.match_threshold, 2);
    }

    #[test]
    fn test_engine_schedule_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.summary_hour, 12);
        assert_eq!(
            (config.transactions_summary_day, config.transactions_summary_hour),
            (5, 10)
        );
        assert_eq!(config.summary_type_codes, vec!["CR", "BP", "VIS", "CHG", "DD"]);
        assert_eq!(config.venue_codes.get("Widbrook").map(String::as_str), Some("WID"));
    }
}
