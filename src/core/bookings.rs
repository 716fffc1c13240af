//! Booking engine facade
//!
//! `Bookings` is the single entry point the binary and integration tests drive. It
//! wires the lifecycle, reconciliation and roster components to one shared
//! [`EngineContext`] and sequences the compound passes:
//! - member import: replace members, sweep, reprocess withheld confirmations
//! - transaction import: fingerprint and store credits, reconcile
//! - hourly: sweep, recovery, reminders, then the scheduled operator reports

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};

use super::context::EngineContext;
use super::lifecycle::{BookingLifecycle, IntakeOutcome, ReprocessReport, SubmissionFeed};
use super::reconcile::{PaymentReconciler, ReconcileReport};
use super::roster::SessionRosterBuilder;
use super::statement::TransactionsSummaryBuilder;
use crate::store::BulkReport;
use crate::types::{BookingError, BookingRequest, Member, Transaction};

/// Outcome of a member import
#[derive(Debug, Default)]
pub struct MemberImport {
    pub members: BulkReport,
    pub expired: usize,
    pub reprocessed: ReprocessReport,
}

/// Outcome of a transaction import
#[derive(Debug, Default)]
pub struct TransactionImport {
    pub transactions: BulkReport,
    pub reconciled: ReconcileReport,
}

/// Outcome of the hourly pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HourlyReport {
    pub expired: usize,
    /// Requests recovered from the feed; 0 when no feed was given
    pub recovered: usize,
    pub reminded: usize,
    /// Rosters sent; 0 outside the roster hour
    pub rosters: usize,
    /// Lines in the transactions summary, when it was due
    pub transaction_lines: Option<usize>,
}

/// Booking engine
///
/// Holds no state beyond its context, so each pass re-derives everything from the
/// stores and passes can be repeated safely.
pub struct Bookings {
    ctx: EngineContext,
    lifecycle: BookingLifecycle,
    reconciler: PaymentReconciler,
    roster: SessionRosterBuilder,
    statement: TransactionsSummaryBuilder,
}

impl Bookings {
    /// Create a new engine over `ctx`
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            lifecycle: BookingLifecycle::new(ctx.clone()),
            reconciler: PaymentReconciler::new(ctx.clone()),
            roster: SessionRosterBuilder::new(ctx.clone()),
            statement: TransactionsSummaryBuilder::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Take in one booking request
    pub async fn intake(&self, request: &BookingRequest) -> Result<IntakeOutcome, BookingError> {
        self.lifecycle.intake(request).await
    }

    /// Replace the member table, then revisit submissions it may unblock
    ///
    /// # Arguments
    ///
    /// * `members` - Full member export; each record overwrites the stored one
    /// * `now` - Pass clock
    ///
    /// # Errors
    ///
    /// Store or dispatcher failures during the sweep or reprocessing. Members that
    /// fail to write are reported in [`MemberImport::members`], not as errors.
    pub async fn import_members(
        &self,
        members: Vec<Member>,
        now: DateTime<Utc>,
    ) -> Result<MemberImport, BookingError> {
        let members = self.ctx.members.bulk_replace(members).await;
        let expired = self.lifecycle.sweep_expired(now).await?;
        let reprocessed = self.lifecycle.reprocess_withheld(now).await?;
        Ok(MemberImport {
            members,
            expired,
            reprocessed,
        })
    }

    /// Store imported bank lines, then reconcile
    ///
    /// Every line gets its content fingerprint as id and an expiry marker
    /// `record_retention` after its statement date.
    pub async fn import_transactions(
        &self,
        transactions: Vec<Transaction>,
        now: DateTime<Utc>,
    ) -> Result<TransactionImport, BookingError> {
        let retention = self.ctx.config.record_retention;
        let transactions: Vec<Transaction> = transactions
            .into_iter()
            .map(|mut transaction| {
                transaction.expire_at =
                    Some(transaction.date.and_time(NaiveTime::MIN).and_utc() + retention);
                transaction
            })
            .collect();

        let transactions = self.ctx.transactions.bulk_upsert(transactions).await;
        let reconciled = self.reconciler.reconcile(now).await?;
        Ok(TransactionImport {
            transactions,
            reconciled,
        })
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        self.lifecycle.sweep_expired(now).await
    }

    pub async fn send_pay_reminders(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        self.lifecycle.send_pay_reminders(now).await
    }

    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<ReconcileReport, BookingError> {
        self.reconciler.reconcile(now).await
    }

    pub async fn reprocess_withheld(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReprocessReport, BookingError> {
        self.lifecycle.reprocess_withheld(now).await
    }

    pub async fn recover_missing(
        &self,
        feed: &dyn SubmissionFeed,
        now: DateTime<Utc>,
    ) -> Result<usize, BookingError> {
        self.lifecycle.recover_missing(feed, now).await
    }

    /// Send the operator rosters for the configured number of days ahead
    pub async fn send_session_roster(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        self.roster.send(now, self.ctx.config.summary_days).await
    }

    /// Send the operator the summary of recent bank lines
    pub async fn send_transactions_summary(
        &self,
        now: DateTime<Utc>,
    ) -> Result<usize, BookingError> {
        self.statement.send(now).await
    }

    /// Sweep, recover missed requests, send reminders, then any report that is due
    ///
    /// Rosters go out when the clock is in `summary_hour`. The transactions summary
    /// goes out on `transactions_summary_day` in `transactions_summary_hour`.
    ///
    /// # Arguments
    ///
    /// * `now` - Pass clock
    /// * `feed` - Form provider to check for lost requests; skipped when None
    pub async fn hourly(
        &self,
        now: DateTime<Utc>,
        feed: Option<&dyn SubmissionFeed>,
    ) -> Result<HourlyReport, BookingError> {
        let config = &self.ctx.config;
        let expired = self.sweep(now).await?;
        let recovered = match feed {
            Some(feed) => self.recover_missing(feed, now).await?,
            None => 0,
        };
        let reminded = self.send_pay_reminders(now).await?;

        let rosters = if now.hour() == config.summary_hour {
            self.send_session_roster(now).await?
        } else {
            0
        };
        let transaction_lines = if now.day() == config.transactions_summary_day
            && now.hour() == config.transactions_summary_hour
        {
            Some(self.send_transactions_summary(now).await?)
        } else {
            None
        };

        tracing::info!(
            expired,
            recovered,
            reminded,
            rosters,
            ?transaction_lines,
            "hourly pass complete"
        );
        Ok(HourlyReport {
            expired,
            recovered,
            reminded,
            rosters,
            transaction_lines,
        })
    }
}
