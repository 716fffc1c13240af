use crate::config::{EngineConfig, StoreConfig, MAX_SUMMARY_DAYS};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Run one pass of the club booking engine
#[derive(Parser, Debug)]
#[command(name = "club-bookings")]
#[command(about = "Reconcile club training bookings with bank payments", long_about = None)]
pub struct CliArgs {
    /// Pass to run
    #[arg(value_name = "PASS")]
    pub pass: PassType,

    /// Directory holding the members, submissions and transactions stores
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        help = "Directory holding members.json, submissions.json and transactions.json"
    )]
    pub data_dir: PathBuf,

    /// Pass clock; defaults to the current time
    #[arg(
        long = "now",
        value_name = "RFC3339",
        help = "Pass clock, e.g. 2025-06-05T12:00:00Z (default: current time)"
    )]
    pub now: Option<DateTime<Utc>>,

    /// Operator mailbox for alerts and rosters
    #[arg(long = "operator", value_name = "EMAIL")]
    pub operator: Option<String>,

    /// JSON array of records for intake, imports and recovery
    #[arg(long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Maximum in-flight record updates during bulk writes
    #[arg(
        long = "bulk-concurrency",
        value_name = "COUNT",
        help = "Maximum in-flight record updates during bulk writes (default: 20)"
    )]
    pub bulk_concurrency: Option<usize>,

    /// Attempts per record update before giving up
    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        help = "Attempts per record update before giving up (default: 5)"
    )]
    pub max_attempts: Option<u32>,

    /// Days ahead covered by session rosters
    #[arg(
        long = "summary-days",
        value_name = "DAYS",
        help = "Days ahead, from the start of today, covered by session rosters (default: 3)"
    )]
    pub summary_days: Option<i64>,

    /// Hour of day at which the hourly pass sends rosters
    #[arg(
        long = "summary-hour",
        value_name = "HOUR",
        help = "Hour of day (UTC, 0-23) at which the hourly pass sends rosters (default: 12)"
    )]
    pub summary_hour: Option<u32>,
}

/// Passes the binary can run
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PassType {
    /// Take in booking requests from --input
    Intake,
    /// Replace members from --input, then reprocess withheld confirmations
    ImportMembers,
    /// Store bank lines from --input, then reconcile
    ImportTransactions,
    /// Move past sessions to IN_PAST
    Sweep,
    /// Send pay reminders
    Reminders,
    /// Match stored credits to outstanding bookings
    Reconcile,
    /// Run intake for requests in --input that never reached the store
    Recover,
    /// Send session rosters to the operator
    Summary,
    /// Send the operator a summary of recent bank lines
    TransactionsSummary,
    /// Sweep, recovery from an optional --input, reminders and scheduled reports
    Hourly,
}

impl PassType {
    /// Whether the pass reads records from --input
    pub fn needs_input(&self) -> bool {
        matches!(
            self,
            PassType::Intake
                | PassType::ImportMembers
                | PassType::ImportTransactions
                | PassType::Recover
        )
    }
}

impl CliArgs {
    /// Create a StoreConfig from CLI arguments
    ///
    /// Missing values fall back to the defaults; zeros are replaced with the defaults
    /// and a warning is logged.
    pub fn to_store_config(&self) -> StoreConfig {
        if self.max_attempts.is_some() || self.bulk_concurrency.is_some() {
            let default = StoreConfig::default();
            StoreConfig::new(
                self.max_attempts.unwrap_or(default.max_attempts),
                self.bulk_concurrency.unwrap_or(default.bulk_concurrency),
            )
        } else {
            StoreConfig::default()
        }
    }

    /// Create an EngineConfig from CLI arguments
    pub fn to_engine_config(&self) -> EngineConfig {
        let mut config = match &self.operator {
            Some(operator) => EngineConfig::with_operator(operator),
            None => EngineConfig::default(),
        };
        if let Some(days) = self.summary_days {
            if days <= 0 {
                tracing::warn!(
                    summary_days = days,
                    default = config.summary_days,
                    "invalid summary_days, using default"
                );
            } else if days > MAX_SUMMARY_DAYS {
                tracing::warn!(
                    summary_days = days,
                    max = MAX_SUMMARY_DAYS,
                    "summary_days too large, capping"
                );
                config.summary_days = MAX_SUMMARY_DAYS;
            } else {
                config.summary_days = days;
            }
        }
        if let Some(hour) = self.summary_hour {
            if hour < 24 {
                config.summary_hour = hour;
            } else {
                tracing::warn!(
                    summary_hour = hour,
                    default = config.summary_hour,
                    "invalid summary_hour, using default"
                );
            }
        }
        config
    }

    /// Pass clock, the current time unless --now was given
    pub fn clock(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}
