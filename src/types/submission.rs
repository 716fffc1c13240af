//! Booking submission types
//!
//! A submission is one bookable entry from an external booking request. Entries from
//! the same request are cross-linked through `linked_submission_ids` and must move
//! through the lifecycle together.
//!
//! # State Machine
//!
//! ```text
//! RECEIVED ──▶ PAID ──▶ IN_PAST
//!    │  └──────────────▲
//!    └──▶ DROPPED ◀── PAID
//! ```
//!
//! IN_PAST and DROPPED are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::transaction::TransactionId;

/// Composite submission identifier, `"<submissionId>-<entryIndex>"`
pub type SubmissionId = String;

/// Build the composite id for a 1-based entry index
pub fn submission_id(external_id: &str, entry_index: usize) -> SubmissionId {
    format!("{}-{}", external_id, entry_index)
}

/// Lifecycle state of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    /// Booked, awaiting payment
    Received,
    /// Matched to a bank transaction
    Paid,
    /// The session date has passed
    InPast,
    /// The linked group could not be salvaged
    Dropped,
}

impl SubmissionState {
    /// Stored representation, also the partition key of the state index
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Received => "RECEIVED",
            SubmissionState::Paid => "PAID",
            SubmissionState::InPast => "IN_PAST",
            SubmissionState::Dropped => "DROPPED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::InPast | SubmissionState::Dropped)
    }

    /// Whether the lifecycle permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Received, Paid) | (Received, InPast) | (Paid, InPast) | (Received, Dropped) | (Paid, Dropped)
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One booked training-session entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Composite id, see [`submission_id`]
    pub id: SubmissionId,

    pub state: SubmissionState,

    /// Start of the training session
    pub training_date: DateTime<Utc>,

    /// Training date minus the payment grace window
    pub pay_by_date: DateTime<Utc>,

    /// When the member submitted the request
    pub request_date: DateTime<Utc>,

    pub membership_number: String,

    pub venue: String,

    pub horse_name: String,

    /// Price of this entry in minor currency units
    pub amount_due: i64,

    /// Reference the member was asked to quote on the bank transfer
    pub payment_reference: String,

    /// Every entry of the originating request, this one included
    pub linked_submission_ids: Vec<SubmissionId>,

    /// Membership status the member claimed on the form
    pub requested_current_membership: bool,

    /// Membership status computed from the member record
    pub actual_current_membership: bool,

    pub found_member_record: bool,

    pub lapsed_membership: bool,

    pub received_request_email_sent: bool,

    pub pay_reminder_email_sent: bool,

    pub payment_discrepancy: bool,

    /// Matched transaction, absent until reconciliation attaches one
    pub payment_record_id: Option<TransactionId>,

    /// Garbage-collection marker for the backing store
    pub expire_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Linked ids, falling back to the submission's own id for unlinked records
    pub fn group_ids(&self) -> Vec<SubmissionId> {
        if self.linked_submission_ids.is_empty() {
            vec![self.id.clone()]
        } else {
            self.linked_submission_ids.clone()
        }
    }

    pub fn is_matched(&self) -> bool {
        self.payment_record_id.is_some()
    }

    /// Move to `next` if the lifecycle allows it
    ///
    /// Returns whether the state changed. Illegal moves (including anything out of a
    /// terminal state) leave the submission untouched.
    pub fn advance(&mut self, next: SubmissionState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Attach a transaction and move RECEIVED to PAID
    ///
    /// Submissions already past their session keep their state but still record the
    /// payment.
    pub fn mark_paid(&mut self, transaction_id: &str) {
        self.payment_record_id = Some(transaction_id.to_string());
        if self.state == SubmissionState::Received {
            self.state = SubmissionState::Paid;
        }
    }

    /// Move to IN_PAST when the session started before `now`
    pub fn expire_if_past(&mut self, now: DateTime<Utc>) -> bool {
        self.training_date < now && self.advance(SubmissionState::InPast)
    }
}
