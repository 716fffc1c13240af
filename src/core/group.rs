//! Linked submission groups
//!
//! Every entry of a booking request is stored as its own submission, cross-linked
//! through `linked_submission_ids`. Whatever happens to one entry (confirmation,
//! reminder, payment, drop) happens to the whole group, so passes resolve the group
//! before acting.
//!
//! # Resolution order
//!
//! A pass usually holds a batch of submissions it has already read and possibly
//! modified. The resolver consults that batch first so in-flight changes are seen,
//! and falls back to the record store for siblings outside the batch. A linked id
//! found in neither place is a broken group and fails the pass.

use std::collections::{BTreeMap, HashMap};

use super::notify::Audience;
use crate::store::{MemberTable, StoreResult, SubmissionTable};
use crate::types::{BookingError, Member, SessionEntry, Submission, SubmissionId};

/// Submissions a pass is working on, keyed by id
#[derive(Debug, Default, Clone)]
pub struct SubmissionBatch {
    submissions: BTreeMap<SubmissionId, Submission>,
}

impl SubmissionBatch {
    pub fn new(submissions: impl IntoIterator<Item = Submission>) -> Self {
        let mut batch = Self::default();
        batch.absorb(submissions);
        batch
    }

    pub fn get(&self, id: &str) -> Option<&Submission> {
        self.submissions.get(id)
    }

    /// Insert or replace submissions with their latest copies
    pub fn absorb(&mut self, submissions: impl IntoIterator<Item = Submission>) {
        for submission in submissions {
            self.submissions.insert(submission.id.clone(), submission);
        }
    }

    /// Ids ordered by request date, then id
    ///
    /// Passes walk the batch in this order so that results do not depend on how the
    /// store happened to return records.
    pub fn ids_by_request_date(&self) -> Vec<SubmissionId> {
        let mut keyed: Vec<(&Submission, &SubmissionId)> = self
            .submissions
            .iter()
            .map(|(id, submission)| (submission, id))
            .collect();
        keyed.sort_by(|(a, a_id), (b, b_id)| {
            a.request_date
                .cmp(&b.request_date)
                .then_with(|| a_id.cmp(b_id))
        });
        keyed.into_iter().map(|(_, id)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }
}

/// A resolved linked group with the member record of each entry
#[derive(Debug, Clone)]
pub struct SubmissionGroup {
    /// In `linked_submission_ids` order
    pub submissions: Vec<Submission>,
    /// `members[i]` belongs to `submissions[i]`; None for unknown membership numbers
    pub members: Vec<Option<Member>>,
}

impl SubmissionGroup {
    pub fn ids(&self) -> Vec<SubmissionId> {
        self.submissions.iter().map(|s| s.id.clone()).collect()
    }

    pub fn all_members_found(&self) -> bool {
        self.members.iter().all(Option::is_some)
    }

    /// Member records that exist, in entry order
    pub fn found_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().flatten()
    }

    /// Entry with the earliest pay-by date; ties go to the smaller id
    pub fn earliest_pay_by(&self) -> Option<&Submission> {
        self.submissions
            .iter()
            .min_by(|a, b| a.pay_by_date.cmp(&b.pay_by_date).then_with(|| a.id.cmp(&b.id)))
    }

    /// Sum of `amount_due` across the group
    pub fn total_amount(&self) -> i64 {
        self.submissions.iter().map(|s| s.amount_due).sum()
    }

    pub fn any_lapsed(&self) -> bool {
        self.submissions.iter().any(|s| s.lapsed_membership)
    }

    /// Recipients and salutation built from the found members
    pub fn audience(&self) -> Audience {
        Audience::from_members(self.found_members())
    }

    /// Sessions as presented in member notifications
    pub fn entries(&self) -> Vec<SessionEntry> {
        self.submissions
            .iter()
            .map(|s| SessionEntry {
                venue: s.venue.clone(),
                training_date: s.training_date,
                horse_name: s.horse_name.clone(),
            })
            .collect()
    }

    /// Apply `f` to every submission of the group
    pub fn for_each_submission(&mut self, f: impl FnMut(&mut Submission)) {
        self.submissions.iter_mut().for_each(f);
    }
}

/// Resolves linked groups for one pass
///
/// Member lookups are cached for the life of the resolver, so create one per pass.
pub struct GroupResolver {
    submissions: SubmissionTable,
    members: MemberTable,
    member_cache: HashMap<String, Option<Member>>,
}

impl GroupResolver {
    pub fn new(submissions: SubmissionTable, members: MemberTable) -> Self {
        Self {
            submissions,
            members,
            member_cache: HashMap::new(),
        }
    }

    /// Look up a member, caching hits and misses
    pub async fn member(&mut self, membership_number: &str) -> StoreResult<Option<Member>> {
        if let Some(cached) = self.member_cache.get(membership_number) {
            return Ok(cached.clone());
        }
        let member = self.members.get(membership_number).await?;
        self.member_cache
            .insert(membership_number.to_string(), member.clone());
        Ok(member)
    }

    /// Resolve the group `seed` belongs to
    ///
    /// `seed` itself is taken as given; siblings come from `batch`, then the store.
    ///
    /// # Errors
    ///
    /// * `BookingError::MissingSubmission` if a linked id exists nowhere
    /// * `BookingError::Store` if a store read fails
    pub async fn resolve(
        &mut self,
        seed: &Submission,
        batch: &SubmissionBatch,
    ) -> Result<SubmissionGroup, BookingError> {
        let ids = seed.group_ids();
        let mut submissions = Vec::with_capacity(ids.len());
        let mut members = Vec::with_capacity(ids.len());

        for id in ids {
            let submission = if id == seed.id {
                seed.clone()
            } else if let Some(in_batch) = batch.get(&id) {
                in_batch.clone()
            } else {
                self.submissions
                    .get(&id)
                    .await?
                    .ok_or_else(|| BookingError::missing_submission(&id))?
            };
            members.push(self.member(&submission.membership_number).await?);
            submissions.push(submission);
        }

        Ok(SubmissionGroup {
            submissions,
            members,
        })
    }
}
