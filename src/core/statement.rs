//! Transactions summary
//!
//! Lists every recent bank line of the configured types next to the submissions it
//! settled, so the operator can check the statement against the bookings. Lines no
//! submission claims are marked "No Payment Found", and settled submissions with a
//! wrong amount are called out per member.

use chrono::{DateTime, Months, Utc};
use std::collections::{BTreeMap, HashMap};

use super::context::EngineContext;
use crate::types::{
    format_amount, BookingError, NotificationData, Submission, SubmissionState, TemplateKey,
    Transaction, TransactionLine, TransactionsSummary,
};

/// Note on a bank line that no submission claims
pub const NO_PAYMENT_FOUND: &str = "No Payment Found";

/// Note on a bank line that settled `membership_number`'s booking with the wrong amount
pub fn discrepancy_remark(membership_number: &str) -> String {
    format!("Payment Discrepancy, Member {}", membership_number)
}

/// One summary line per transaction, in the order given
///
/// # Arguments
///
/// * `transactions` - Bank lines to list
/// * `submissions` - Submissions that may point at them through `payment_record_id`
/// * `venue_codes` - Short venue names; unknown venues are listed in full
pub fn summary_lines(
    transactions: &[Transaction],
    submissions: &[Submission],
    venue_codes: &BTreeMap<String, String>,
) -> Vec<TransactionLine> {
    let mut settled: HashMap<&str, Vec<&Submission>> = HashMap::new();
    for submission in submissions {
        if let Some(payment) = submission.payment_record_id.as_deref() {
            settled.entry(payment).or_default().push(submission);
        }
    }

    transactions
        .iter()
        .map(|transaction| {
            let linked = settled
                .get(transaction.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut notes: Vec<String> = linked
                .iter()
                .filter(|s| s.payment_discrepancy)
                .map(|s| discrepancy_remark(&s.membership_number))
                .collect();
            if linked.is_empty() {
                notes.push(NO_PAYMENT_FOUND.to_string());
            }

            let venues: Vec<&str> = linked
                .iter()
                .map(|s| {
                    venue_codes
                        .get(&s.venue)
                        .map(String::as_str)
                        .unwrap_or(s.venue.as_str())
                })
                .collect();

            TransactionLine {
                date: transaction.date,
                type_code: transaction.type_code.clone(),
                description: transaction.full_description(),
                amount: format_amount(transaction.amount),
                venues: venues.join(" "),
                balance: format_amount(transaction.balance),
                notes,
                reference: linked
                    .first()
                    .map(|s| s.payment_reference.clone())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// Collects recent bank lines and sends the summary to the operator
pub struct TransactionsSummaryBuilder {
    ctx: EngineContext,
}

impl TransactionsSummaryBuilder {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Send the summary of the last `transactions_summary_months` months
    ///
    /// Submissions in every state are consulted, so payments for sessions that have
    /// since passed or been dropped still show as found. The summary is sent even
    /// when it has no lines. Returns the number of lines.
    ///
    /// # Errors
    ///
    /// * `BookingError::InvalidWindow` when the window reaches before the calendar
    /// * `BookingError::Store` / `Notify` from the collaborators
    pub async fn send(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        let config = &self.ctx.config;
        let since = now
            .checked_sub_months(Months::new(config.transactions_summary_months))
            .ok_or_else(|| {
                BookingError::invalid_window(&format!(
                    "transactions summary of {} months",
                    config.transactions_summary_months
                ))
            })?;

        let mut submissions = Vec::new();
        for state in [
            SubmissionState::Received,
            SubmissionState::Paid,
            SubmissionState::InPast,
            SubmissionState::Dropped,
        ] {
            submissions.extend(
                self.ctx
                    .submissions
                    .query_by_state_since(state, since)
                    .await?,
            );
        }
        submissions.sort_by(|a, b| a.id.cmp(&b.id));

        let mut transactions = Vec::new();
        for type_code in &config.summary_type_codes {
            transactions.extend(
                self.ctx
                    .transactions
                    .query_by_type_since(type_code, since.date_naive())
                    .await?,
            );
        }
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        let summary = TransactionsSummary {
            since: since.date_naive(),
            lines: summary_lines(&transactions, &submissions, &config.venue_codes),
        };
        let lines = summary.lines.len();
        tracing::info!(lines, since = %summary.since, "sending transactions summary");

        self.ctx
            .dispatcher
            .send(
                std::slice::from_ref(&config.operator_address),
                TemplateKey::TransactionsSummary,
                &NotificationData::Transactions(summary),
            )
            .await?;
        Ok(lines)
    }
}
