//! Payment reconciliation
//!
//! Matches bank credits to unpaid submissions by fuzzy-matching each submission's
//! payment reference against transaction descriptions.
//!
//! # Algorithm
//!
//! For every RECEIVED submission without a payment, in request-date order:
//! 1. Consider credits dated on or after the request day that no submission has
//!    claimed yet (settled history and earlier matches of this pass included).
//! 2. Keep the candidate with the smallest [`distance`]; on ties the earliest
//!    transaction wins.
//! 3. Accept it when the distance is within the configured threshold.
//! 4. Attach the transaction to the whole linked group, move RECEIVED entries to PAID,
//!    compare the group total with the amount received, notify and persist.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::context::EngineContext;
use super::group::{SubmissionBatch, SubmissionGroup};
use super::lifecycle::lapsed_note;
use super::matcher::distance;
use crate::types::{
    format_amount, BookingError, Submission, SubmissionState, TemplateKey, Transaction,
    TransactionId,
};

/// One accepted match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMatch {
    pub transaction_id: TransactionId,
    pub submission_ids: Vec<String>,
    pub distance: usize,
    pub discrepancy: bool,
}

/// Outcome of a reconciliation pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub matched: Vec<PaymentMatch>,
    /// Submissions left for a later pass
    pub unmatched: usize,
}

/// Best candidate for `submission` among `transactions`
///
/// `transactions` must be in (date, id) order; a later candidate only wins on a
/// strictly smaller distance.
pub fn best_match<'a>(
    submission: &Submission,
    transactions: &'a [Transaction],
    claimed: &HashSet<TransactionId>,
) -> Option<(usize, &'a Transaction)> {
    let request_day = submission.request_date.date_naive();
    let mut best: Option<(usize, &Transaction)> = None;

    for transaction in transactions {
        if transaction.date < request_day || claimed.contains(&transaction.id) {
            continue;
        }
        let score = distance(&submission.payment_reference, &transaction.description);
        tracing::debug!(
            submission_id = %submission.id,
            transaction_id = %transaction.id,
            distance = score,
            "scored candidate"
        );
        if best.is_none_or(|(best_score, _)| score < best_score) {
            best = Some((score, transaction));
        }
    }
    best
}

/// Discrepancy remark quoting both amounts
pub fn discrepancy_note(sessions: usize, requested: i64, received: i64) -> String {
    format!(
        "The payment amount is incorrect. The requested {} total price is {}, payment received {}.",
        if sessions == 1 { "session" } else { "sessions" },
        format_amount(requested),
        format_amount(received)
    )
}

/// Matches credits to outstanding submissions
pub struct PaymentReconciler {
    ctx: EngineContext,
}

impl PaymentReconciler {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// The accepted matches and how many submissions stayed unmatched. Unmatched
    /// payments are not errors; the next pass tries again.
    ///
    /// # Errors
    ///
    /// Store or dispatcher failures, and linked ids that resolve to nothing.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<ReconcileReport, BookingError> {
        let config = &self.ctx.config;
        let since = (now - config.transaction_lookback).date_naive();
        let mut transactions = self
            .ctx
            .transactions
            .query_by_type_since(&config.credit_type, since)
            .await?;
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        let received = self
            .ctx
            .submissions
            .query_by_state(SubmissionState::Received)
            .await?;
        let settled_since = now - config.paid_lookback;
        let mut claimed: HashSet<TransactionId> = HashSet::new();
        for state in [SubmissionState::Paid, SubmissionState::InPast] {
            for settled in self
                .ctx
                .submissions
                .query_by_state_since(state, settled_since)
                .await?
            {
                claimed.extend(settled.payment_record_id);
            }
        }
        claimed.extend(received.iter().filter_map(|s| s.payment_record_id.clone()));

        tracing::info!(
            transactions = transactions.len(),
            received = received.len(),
            "reconciling payments"
        );

        let mut batch = SubmissionBatch::new(received);
        let mut resolver = self.ctx.resolver();
        let mut report = ReconcileReport::default();

        for id in batch.ids_by_request_date() {
            let Some(submission) = batch.get(&id).cloned() else {
                continue;
            };
            if submission.state != SubmissionState::Received || submission.is_matched() {
                continue;
            }
            if submission.payment_reference.trim().is_empty() {
                tracing::warn!(submission_id = %id, "no payment reference, cannot match");
                report.unmatched += 1;
                continue;
            }

            let accepted = best_match(&submission, &transactions, &claimed)
                .filter(|(score, _)| *score <= config.match_threshold)
                .map(|(score, transaction)| (score, transaction.clone()));
            let Some((score, transaction)) = accepted else {
                report.unmatched += 1;
                continue;
            };

            let mut group = resolver.resolve(&submission, &batch).await?;
            claimed.insert(transaction.id.clone());
            let discrepancy = self.settle(&mut group, &transaction).await?;
            tracing::info!(
                submission_id = %id,
                transaction_id = %transaction.id,
                distance = score,
                discrepancy,
                "payment matched"
            );

            report.matched.push(PaymentMatch {
                transaction_id: transaction.id.clone(),
                submission_ids: group.ids(),
                distance: score,
                discrepancy,
            });
            batch.absorb(group.submissions);
        }

        Ok(report)
    }

    /// Apply a matched transaction to the whole group, notify and persist
    ///
    /// Returns whether the amount received differs from the group total.
    async fn settle(
        &self,
        group: &mut SubmissionGroup,
        transaction: &Transaction,
    ) -> Result<bool, BookingError> {
        let total = group.total_amount();
        let discrepancy = total != transaction.amount;
        let mut notes = Vec::new();

        group.for_each_submission(|s| {
            s.mark_paid(&transaction.id);
            if discrepancy {
                s.payment_discrepancy = true;
            }
        });
        if discrepancy {
            notes.push(discrepancy_note(
                group.submissions.len(),
                total,
                transaction.amount,
            ));
        }
        if group.any_lapsed() {
            notes.push(lapsed_note());
        }

        self.ctx
            .notify_group(
                group,
                TemplateKey::ReceivedPayment,
                Some(transaction.amount),
                notes,
            )
            .await?;
        self.ctx.persist(group.submissions.clone()).await;

        let unknown: Vec<&str> = group
            .submissions
            .iter()
            .filter(|s| !s.found_member_record)
            .map(|s| s.membership_number.as_str())
            .collect();
        if !unknown.is_empty() {
            let body = format!(
                "Payment received against invalid membership number {}.\n{}",
                unknown.join(", "),
                transaction
            );
            self.ctx
                .alert_operator("Payment for unknown membership number", &body)
                .await?;
        }
        Ok(discrepancy)
    }
}
