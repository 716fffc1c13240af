//! Booking state machine
//!
//! This module owns every lifecycle transition except payment matching:
//! - intake of a booking request into a linked group of RECEIVED submissions
//! - the expiry sweep moving past sessions to IN_PAST
//! - pay reminders for confirmed, unpaid groups
//! - reprocessing of withheld confirmations after a member import, which may drop a
//!   group that cannot be salvaged
//! - recovery of requests the webhook never delivered
//!
//! # Idempotency
//!
//! Passes can be re-run at any time. Every step is guarded by a persisted flag
//! (`received_request_email_sent`, `pay_reminder_email_sent`, state) and re-derives
//! what to do from stored records alone. A pass that fails halfway leaves its
//! completed writes in place and the next pass finishes the job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::context::EngineContext;
use super::group::{SubmissionBatch, SubmissionGroup};
use crate::types::{
    submission_id, BookingEntry, BookingError, BookingRequest, Member, Submission, SubmissionId,
    SubmissionState, TemplateKey,
};

/// Remark added to member notices while a membership lapses before the session
pub fn lapsed_note() -> String {
    "Your membership runs out before the training session. Please renew your membership \
     before the session."
        .to_string()
}

/// What intake did with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Stored and the group confirmation sent
    Confirmed(Vec<SubmissionId>),
    /// Stored, confirmation withheld pending operator action
    Withheld(Vec<SubmissionId>),
    /// The request was already confirmed or past RECEIVED; nothing changed
    AlreadyProcessed(Vec<SubmissionId>),
}

impl IntakeOutcome {
    pub fn submission_ids(&self) -> &[SubmissionId] {
        match self {
            IntakeOutcome::Confirmed(ids)
            | IntakeOutcome::Withheld(ids)
            | IntakeOutcome::AlreadyProcessed(ids) => ids,
        }
    }
}

/// Result of reprocessing withheld confirmations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReprocessReport {
    /// Groups whose confirmation went out
    pub confirmed: usize,
    /// Groups dropped for an unknown membership number
    pub dropped: usize,
}

/// Source of booking requests straight from the form provider
///
/// Used to catch requests whose webhook delivery was lost.
#[async_trait]
pub trait SubmissionFeed: Send + Sync {
    /// Requests made at or after `since`
    async fn requests_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<BookingRequest>, BookingError>;
}

/// Feed over a fixed list of requests, e.g. an export file
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    requests: Vec<BookingRequest>,
}

impl StaticFeed {
    pub fn new(requests: Vec<BookingRequest>) -> Self {
        Self { requests }
    }
}

#[async_trait]
impl SubmissionFeed for StaticFeed {
    async fn requests_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<BookingRequest>, BookingError> {
        Ok(self
            .requests
            .iter()
            .filter(|request| request.request_date >= since)
            .cloned()
            .collect())
    }
}

/// Lifecycle transitions over the submission store
pub struct BookingLifecycle {
    ctx: EngineContext,
}

impl BookingLifecycle {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Turn a booking request into a linked group of RECEIVED submissions
    ///
    /// Each entry is validated against the member table and persisted as soon as it
    /// is built. The confirmation is sent once for the whole group, and only when
    /// every entry passed validation. Otherwise the operator is alerted per failing
    /// entry and the group's `received_request_email_sent` is cleared so a later
    /// member import can finish the job.
    ///
    /// A redelivered request whose confirmation already went out changes nothing. A
    /// redelivered withheld request is validated again without repeating the operator
    /// alerts, keeping the stored reminder flag and payment link.
    ///
    /// # Errors
    ///
    /// * `BookingError::EmptyRequest` / `MalformedRequest` for unusable requests
    /// * `BookingError::Store` / `Notify` from the collaborators
    pub async fn intake(&self, request: &BookingRequest) -> Result<IntakeOutcome, BookingError> {
        request.validate()?;

        let ids: Vec<SubmissionId> = (1..=request.entries.len())
            .map(|index| submission_id(&request.submission_id, index))
            .collect();

        let mut stored = Vec::with_capacity(ids.len());
        for id in &ids {
            stored.push(self.ctx.submissions.get(id).await?);
        }
        if let Some(Some(existing)) = stored.first() {
            if existing.state != SubmissionState::Received || existing.received_request_email_sent
            {
                tracing::info!(
                    submission_id = %request.submission_id,
                    state = %existing.state,
                    "request already processed, ignoring redelivery"
                );
                return Ok(IntakeOutcome::AlreadyProcessed(ids));
            }
        }
        // a withheld group seen again: the operator already has the alerts
        let redelivered = stored.iter().any(Option::is_some);

        let mut resolver = self.ctx.resolver();
        let mut submissions = Vec::with_capacity(ids.len());
        let mut members = Vec::with_capacity(ids.len());
        let mut withheld = false;

        for ((entry, id), previous) in request.entries.iter().zip(&ids).zip(stored) {
            let mut submission = self.new_submission(request, entry, id, &ids);
            if let Some(previous) = previous {
                submission.pay_reminder_email_sent = previous.pay_reminder_email_sent;
                submission.payment_record_id = previous.payment_record_id;
            }
            let member = resolver.member(&entry.membership_number).await?;

            let alert = match &member {
                None => {
                    submission.found_member_record = false;
                    withheld = true;
                    Some(unknown_member_alert(&submission))
                }
                Some(member) => {
                    submission.found_member_record = true;
                    submission.actual_current_membership =
                        member.is_current_on(submission.training_date);
                    if submission.requested_current_membership
                        && !submission.actual_current_membership
                    {
                        submission.lapsed_membership = true;
                        withheld = true;
                        Some(lapsed_member_alert(&submission, member))
                    } else {
                        None
                    }
                }
            };

            self.ctx.submissions.put(submission.clone()).await?;
            tracing::debug!(submission_id = %submission.id, "stored submission");

            match alert {
                Some((subject, body)) if !redelivered => {
                    self.ctx.alert_operator(&subject, &body).await?;
                }
                Some(_) => {
                    tracing::debug!(submission_id = %submission.id, "alert already raised");
                }
                None => {}
            }
            submissions.push(submission);
            members.push(member);
        }

        let mut group = SubmissionGroup {
            submissions,
            members,
        };

        if withheld {
            group.for_each_submission(|s| s.received_request_email_sent = false);
            self.ctx.persist(group.submissions).await;
            tracing::info!(submission_id = %request.submission_id, "confirmation withheld");
            return Ok(IntakeOutcome::Withheld(ids));
        }

        self.ctx
            .notify_group(&group, TemplateKey::ReceivedRequest, None, Vec::new())
            .await?;
        tracing::info!(
            submission_id = %request.submission_id,
            entries = ids.len(),
            "booking request confirmed"
        );
        Ok(IntakeOutcome::Confirmed(ids))
    }

    /// Move every RECEIVED or PAID submission whose session has started to IN_PAST
    ///
    /// Applied per submission, not per group. Returns how many were moved.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        let mut expired = Vec::new();
        for state in [SubmissionState::Received, SubmissionState::Paid] {
            for mut submission in self.ctx.submissions.query_by_state_before(state, now).await? {
                if submission.expire_if_past(now) {
                    expired.push(submission);
                }
            }
        }

        if expired.is_empty() {
            return Ok(0);
        }
        let report = self.ctx.persist(expired).await;
        tracing::info!(moved = report.updated, "swept past submissions");
        Ok(report.updated)
    }

    /// Send one reminder per confirmed, unpaid group whose pay-by date has passed
    ///
    /// Returns the number of reminders sent.
    pub async fn send_pay_reminders(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        let received = self
            .ctx
            .submissions
            .query_by_state_since(SubmissionState::Received, now)
            .await?;
        let mut batch = SubmissionBatch::new(received);
        let mut resolver = self.ctx.resolver();
        let grace_cutoff = now - self.ctx.config.reminder_grace;
        let mut sent = 0;

        for id in batch.ids_by_request_date() {
            let Some(submission) = batch.get(&id).cloned() else {
                continue;
            };
            if !submission.received_request_email_sent
                || submission.pay_reminder_email_sent
                || submission.is_matched()
                || submission.request_date > grace_cutoff
            {
                continue;
            }

            let mut group = resolver.resolve(&submission, &batch).await?;
            let due = match group.earliest_pay_by() {
                Some(earliest) => {
                    earliest.pay_by_date <= now && !earliest.pay_reminder_email_sent
                }
                None => false,
            };
            if !due {
                continue;
            }
            if !group.all_members_found() {
                tracing::debug!(submission_id = %id, "group has unknown members, no reminder");
                continue;
            }

            self.ctx
                .notify_group(&group, TemplateKey::PayReminder, None, Vec::new())
                .await?;
            group.for_each_submission(|s| s.pay_reminder_email_sent = true);
            batch.absorb(group.submissions.clone());
            self.ctx.persist(group.submissions).await;
            tracing::info!(submission_id = %id, "pay reminder sent");
            sent += 1;
        }
        Ok(sent)
    }

    /// Drop a group that cannot be salvaged and ask the member(s) to resubmit
    ///
    /// When no member of the group can be addressed the operator is told instead.
    pub async fn drop_group(
        &self,
        group: &mut SubmissionGroup,
        reason: &str,
    ) -> Result<(), BookingError> {
        group.for_each_submission(|s| {
            s.advance(SubmissionState::Dropped);
        });

        let notified = self
            .ctx
            .notify_group(group, TemplateKey::ProblemMessage, None, vec![reason.to_string()])
            .await?;
        if !notified {
            let body = format!(
                "Submissions {} were dropped and no member could be notified.\n{}",
                group.ids().join(", "),
                reason
            );
            self.ctx
                .alert_operator("Training request dropped", &body)
                .await?;
        }

        self.ctx.persist(group.submissions.clone()).await;
        tracing::info!(submission_ids = ?group.ids(), "group dropped");
        Ok(())
    }

    /// Revisit every future RECEIVED group whose confirmation is still withheld
    ///
    /// Run after a member import. Membership facts are recomputed from the current
    /// member table. A group with an entry whose number is still unknown is dropped;
    /// any other group is confirmed, with a renewal note while a membership stays
    /// lapsed.
    pub async fn reprocess_withheld(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReprocessReport, BookingError> {
        let pending: Vec<Submission> = self
            .ctx
            .submissions
            .query_by_state_since(SubmissionState::Received, now)
            .await?
            .into_iter()
            .filter(|s| !s.received_request_email_sent)
            .collect();
        let mut batch = SubmissionBatch::new(pending);
        let mut resolver = self.ctx.resolver();
        let mut report = ReprocessReport::default();

        for id in batch.ids_by_request_date() {
            let Some(submission) = batch.get(&id).cloned() else {
                continue;
            };
            // an earlier group in this pass may have covered it
            if submission.state != SubmissionState::Received
                || submission.received_request_email_sent
            {
                continue;
            }

            let mut group = resolver.resolve(&submission, &batch).await?;
            let unknown = refresh_membership(&mut group);

            if !unknown.is_empty() {
                let reason = format!(
                    "The booking could not be processed because membership number {} is not \
                     valid. No sessions have been booked. Please submit a new training request \
                     for all sessions with the correct information.",
                    unknown.join(", ")
                );
                self.drop_group(&mut group, &reason).await?;
                batch.absorb(group.submissions);
                report.dropped += 1;
                continue;
            }

            let notes = if group.any_lapsed() {
                vec![lapsed_note()]
            } else {
                Vec::new()
            };
            self.ctx
                .notify_group(&group, TemplateKey::ReceivedRequest, None, notes)
                .await?;
            group.for_each_submission(|s| s.received_request_email_sent = true);
            batch.absorb(group.submissions.clone());
            self.ctx.persist(group.submissions).await;
            report.confirmed += 1;
        }

        tracing::info!(
            confirmed = report.confirmed,
            dropped = report.dropped,
            "reprocessed withheld confirmations"
        );
        Ok(report)
    }

    /// Run intake for recent requests that never reached the store
    ///
    /// Returns the number of requests recovered.
    pub async fn recover_missing(
        &self,
        feed: &dyn SubmissionFeed,
        now: DateTime<Utc>,
    ) -> Result<usize, BookingError> {
        let since = now - self.ctx.config.missing_lookback;
        let mut recovered = 0;
        for request in feed.requests_since(since).await? {
            let first = submission_id(&request.submission_id, 1);
            if self.ctx.submissions.get(&first).await?.is_some() {
                continue;
            }
            tracing::info!(submission_id = %request.submission_id, "recovering missing request");
            self.intake(&request).await?;
            recovered += 1;
        }
        Ok(recovered)
    }

    fn new_submission(
        &self,
        request: &BookingRequest,
        entry: &BookingEntry,
        id: &str,
        linked: &[SubmissionId],
    ) -> Submission {
        let config = &self.ctx.config;
        Submission {
            id: id.to_string(),
            state: SubmissionState::Received,
            training_date: entry.training_date,
            pay_by_date: entry.training_date - config.pay_by_grace,
            request_date: request.request_date,
            membership_number: entry.membership_number.clone(),
            venue: entry.venue.clone(),
            horse_name: entry.horse_name.clone(),
            amount_due: entry.amount_due,
            payment_reference: request.payment_reference.clone(),
            linked_submission_ids: linked.to_vec(),
            requested_current_membership: entry.requested_current_membership,
            actual_current_membership: false,
            found_member_record: false,
            lapsed_membership: false,
            received_request_email_sent: true,
            pay_reminder_email_sent: false,
            payment_discrepancy: false,
            payment_record_id: None,
            expire_at: Some(entry.training_date + config.record_retention),
        }
    }
}

/// Recompute membership flags from the group's member records
///
/// Returns the membership numbers that still have no record.
fn refresh_membership(group: &mut SubmissionGroup) -> Vec<String> {
    let mut unknown = Vec::new();
    for (submission, member) in group.submissions.iter_mut().zip(&group.members) {
        match member {
            Some(member) => {
                submission.found_member_record = true;
                submission.actual_current_membership =
                    member.is_current_on(submission.training_date);
                submission.lapsed_membership = submission.requested_current_membership
                    && !submission.actual_current_membership;
            }
            None => {
                submission.found_member_record = false;
                if !unknown.contains(&submission.membership_number) {
                    unknown.push(submission.membership_number.clone());
                }
            }
        }
    }
    unknown
}

fn unknown_member_alert(submission: &Submission) -> (String, String) {
    (
        "Training request with unknown membership number".to_string(),
        format!(
            "Submission {} for {} at {} on {} quotes membership number {}, which is not in \
             the member table. The confirmation is withheld until the member record is \
             imported.",
            submission.id,
            submission.horse_name,
            submission.venue,
            submission.training_date.format("%Y-%m-%d %H:%M"),
            submission.membership_number
        ),
    )
}

fn lapsed_member_alert(submission: &Submission, member: &Member) -> (String, String) {
    (
        "Training request with lapsed membership".to_string(),
        format!(
            "Submission {}: {} ({}) claimed a current membership, but it is not valid on {}. \
             The confirmation is withheld until the member record is updated.",
            submission.id,
            member.full_name(),
            member.membership_number,
            submission.training_date.format("%Y-%m-%d")
        ),
    )
}
