//! Training session roster
//!
//! Sends the operator one roster per day and venue for the sessions coming up,
//! listing who is riding, on which horse, and whether they have paid.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

use super::context::EngineContext;
use crate::types::{
    BookingError, Member, NotificationData, PaymentStatus, RequestedLabel, RosterLine,
    SessionRoster, Submission, SubmissionState, TemplateKey,
};

/// Payment column of a roster line
pub fn payment_status(submission: &Submission) -> PaymentStatus {
    match (submission.is_matched(), submission.payment_discrepancy) {
        (true, false) => PaymentStatus::Paid,
        (true, true) => PaymentStatus::IncorrectPayment,
        (false, _) => PaymentStatus::NotPaid,
    }
}

/// Flag for requests made on the roster's day or the day before
pub fn requested_label(request_date: DateTime<Utc>, today: NaiveDate) -> Option<RequestedLabel> {
    let requested = request_date.date_naive();
    if requested == today {
        Some(RequestedLabel::Today)
    } else if today.pred_opt() == Some(requested) {
        Some(RequestedLabel::Yesterday)
    } else {
        None
    }
}

/// Build per day/venue rosters from active submissions and their members
///
/// Lines are ranked paid first, then incorrect payments, then unpaid, each rank in
/// request order. Member addresses are listed once per roster.
pub fn build_rosters(
    entries: impl IntoIterator<Item = (Submission, Member)>,
    today: NaiveDate,
) -> Vec<SessionRoster> {
    let mut sessions: BTreeMap<(NaiveDate, String), Vec<(Submission, Member)>> = BTreeMap::new();
    for (submission, member) in entries {
        let key = (submission.training_date.date_naive(), submission.venue.clone());
        sessions.entry(key).or_default().push((submission, member));
    }

    sessions
        .into_iter()
        .map(|((day, venue), mut riders)| {
            riders.sort_by(|(a, _), (b, _)| {
                payment_status(a)
                    .cmp(&payment_status(b))
                    .then_with(|| a.request_date.cmp(&b.request_date))
                    .then_with(|| a.id.cmp(&b.id))
            });

            let mut member_emails: Vec<String> = Vec::new();
            let lines = riders
                .iter()
                .map(|(submission, member)| {
                    if !member_emails.contains(&member.email) {
                        member_emails.push(member.email.clone());
                    }
                    RosterLine {
                        training_date: submission.training_date,
                        rider: member.full_name(),
                        horse_name: submission.horse_name.clone(),
                        payment: payment_status(submission),
                        requested: requested_label(submission.request_date, today),
                    }
                })
                .collect();

            SessionRoster {
                day,
                venue,
                lines,
                member_emails,
            }
        })
        .collect()
}

/// Collects upcoming sessions and sends their rosters
pub struct SessionRosterBuilder {
    ctx: EngineContext,
}

impl SessionRosterBuilder {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Send rosters for sessions from `now` until the start of today plus `days`
    ///
    /// Submissions whose member record is missing are left off. Returns the number
    /// of rosters sent.
    ///
    /// # Errors
    ///
    /// * `BookingError::InvalidWindow` when `days` reaches past the calendar
    /// * `BookingError::Store` / `Notify` from the collaborators
    pub async fn send(&self, now: DateTime<Utc>, days: i64) -> Result<usize, BookingError> {
        let today = now.date_naive();
        let until = Duration::try_days(days)
            .and_then(|horizon| {
                today
                    .and_time(NaiveTime::MIN)
                    .and_utc()
                    .checked_add_signed(horizon)
            })
            .ok_or_else(|| {
                BookingError::invalid_window(&format!("roster horizon of {} days", days))
            })?;

        let mut resolver = self.ctx.resolver();
        let mut entries = Vec::new();
        for state in [SubmissionState::Received, SubmissionState::Paid] {
            for submission in self
                .ctx
                .submissions
                .query_by_state_between(state, now, until)
                .await?
            {
                if !submission.found_member_record {
                    continue;
                }
                match resolver.member(&submission.membership_number).await? {
                    Some(member) => entries.push((submission, member)),
                    None => tracing::warn!(
                        submission_id = %submission.id,
                        "member record vanished, left off roster"
                    ),
                }
            }
        }

        let rosters = build_rosters(entries, today);
        tracing::info!(rosters = rosters.len(), %until, "sending session rosters");
        for roster in &rosters {
            self.ctx
                .dispatcher
                .send(
                    std::slice::from_ref(&self.ctx.config.operator_address),
                    TemplateKey::TrainingSummary,
                    &NotificationData::Roster(roster.clone()),
                )
                .await?;
        }
        Ok(rosters.len())
    }
}
