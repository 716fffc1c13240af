//! Submission source
//!
//! Submissions are indexed by `(state, training_date)` so the periodic passes can ask
//! for "every RECEIVED submission with a session after X" without scanning the table.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::sync::Arc;

use super::{BulkReport, IndexKey, KeyCondition, Record, RecordStore, StoreResult, Table};
use crate::config::StoreConfig;
use crate::types::{Submission, SubmissionState};

/// Partition: state, sort: training date
pub const STATE_DATE_INDEX: &str = "StateDateIndex";

impl Record for Submission {
    fn id(&self) -> &str {
        &self.id
    }

    /// Overwrite every attribute except the id
    ///
    /// A `None` payment record or expiry in the update leaves the stored value alone,
    /// so a stale copy can never detach a matched payment. An empty link list is
    /// likewise ignored.
    fn merge_from(&mut self, update: &Self) {
        self.state = update.state;
        self.training_date = update.training_date;
        self.pay_by_date = update.pay_by_date;
        self.request_date = update.request_date;
        self.membership_number = update.membership_number.clone();
        self.venue = update.venue.clone();
        self.horse_name = update.horse_name.clone();
        self.amount_due = update.amount_due;
        self.payment_reference = update.payment_reference.clone();
        if !update.linked_submission_ids.is_empty() {
            self.linked_submission_ids = update.linked_submission_ids.clone();
        }
        self.requested_current_membership = update.requested_current_membership;
        self.actual_current_membership = update.actual_current_membership;
        self.found_member_record = update.found_member_record;
        self.lapsed_membership = update.lapsed_membership;
        self.received_request_email_sent = update.received_request_email_sent;
        self.pay_reminder_email_sent = update.pay_reminder_email_sent;
        self.payment_discrepancy = update.payment_discrepancy;
        if update.payment_record_id.is_some() {
            self.payment_record_id = update.payment_record_id.clone();
        }
        if update.expire_at.is_some() {
            self.expire_at = update.expire_at;
        }
    }

    fn indexes() -> &'static [&'static str] {
        &[STATE_DATE_INDEX]
    }

    fn index_key(&self, index: &str) -> Option<IndexKey> {
        (index == STATE_DATE_INDEX).then(|| IndexKey {
            partition: self.state.as_str().to_string(),
            sort: self.training_date,
        })
    }
}

/// Submission storage with state/date queries
#[derive(Clone)]
pub struct SubmissionTable {
    table: Table<Submission>,
}

impl SubmissionTable {
    pub fn new(store: Arc<dyn RecordStore<Submission>>, config: &StoreConfig) -> Self {
        Self {
            table: Table::new(store, config),
        }
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Submission>> {
        self.table.get(id).await
    }

    /// Insert or overwrite; the composite id makes repeated intake idempotent
    pub async fn put(&self, submission: Submission) -> StoreResult<()> {
        self.table.put(submission).await
    }

    /// Every submission in `state`, ordered by training date
    pub async fn query_by_state(&self, state: SubmissionState) -> StoreResult<Vec<Submission>> {
        self.query(KeyCondition::partition(state.as_str())).await
    }

    /// Submissions in `state` whose session starts at or after `since`
    pub async fn query_by_state_since(
        &self,
        state: SubmissionState,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<Submission>> {
        self.query(KeyCondition::partition(state.as_str()).since(since))
            .await
    }

    /// Submissions in `state` whose session started before `before`
    pub async fn query_by_state_before(
        &self,
        state: SubmissionState,
        before: DateTime<Utc>,
    ) -> StoreResult<Vec<Submission>> {
        self.query(KeyCondition::partition(state.as_str()).before(before))
            .await
    }

    /// Submissions in `state` whose session starts in `[since, before)`
    pub async fn query_by_state_between(
        &self,
        state: SubmissionState,
        since: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> StoreResult<Vec<Submission>> {
        self.query(
            KeyCondition::partition(state.as_str())
                .since(since)
                .before(before),
        )
        .await
    }

    /// Merge one submission, retrying on contention
    pub async fn update(&self, submission: &Submission) -> StoreResult<()> {
        self.table.update(&submission.id, submission).await
    }

    /// Best-effort parallel merge of many submissions
    pub async fn bulk_update(&self, submissions: Vec<Submission>) -> BulkReport {
        self.table.bulk_update(submissions).await
    }

    async fn query(&self, condition: KeyCondition) -> StoreResult<Vec<Submission>> {
        self.table
            .query_by_index(STATE_DATE_INDEX, condition)
            .try_collect()
            .await
    }
}
