//! Collaborators shared by every pass
//!
//! Passes receive their store tables, dispatcher and rules through an
//! `EngineContext` built by the caller, never through globals, so each pass can run
//! against in-memory fakes.

use std::sync::Arc;

use super::group::{GroupResolver, SubmissionGroup};
use super::notify::NotificationDispatcher;
use crate::config::EngineConfig;
use crate::store::{BulkReport, MemberTable, SubmissionTable, TransactionTable};
use crate::types::{
    format_amount, BookingError, BookingNotice, NotificationData, Submission, TemplateKey,
};

/// Store tables, dispatcher and rules for one engine instance
#[derive(Clone)]
pub struct EngineContext {
    pub members: MemberTable,
    pub submissions: SubmissionTable,
    pub transactions: TransactionTable,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Fresh resolver with an empty member cache
    pub fn resolver(&self) -> GroupResolver {
        GroupResolver::new(self.submissions.clone(), self.members.clone())
    }

    /// Bulk-write a group's submissions
    ///
    /// Failed writes are logged and left for a later pass to converge; nothing is
    /// rolled back.
    pub async fn persist(&self, submissions: Vec<Submission>) -> BulkReport {
        let report = self.submissions.bulk_update(submissions).await;
        if !report.is_complete() {
            let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
            tracing::warn!(?failed, "group left partially written");
        }
        report
    }

    /// Send a plain-text alert to the operator mailbox
    pub async fn alert_operator(&self, subject: &str, body: &str) -> Result<(), BookingError> {
        tracing::info!(subject, "alerting operator");
        let data = NotificationData::Alert {
            subject: subject.to_string(),
            body: body.to_string(),
        };
        self.dispatcher
            .send(
                std::slice::from_ref(&self.config.operator_address),
                TemplateKey::OperatorAlert,
                &data,
            )
            .await?;
        Ok(())
    }

    /// Send a member-facing notice covering the whole group
    ///
    /// Returns false without sending when no member of the group has a record to
    /// address.
    pub async fn notify_group(
        &self,
        group: &SubmissionGroup,
        template: TemplateKey,
        received_amount: Option<i64>,
        notes: Vec<String>,
    ) -> Result<bool, BookingError> {
        let audience = group.audience();
        if audience.is_empty() {
            tracing::warn!(
                submission_ids = ?group.ids(),
                %template,
                "no member address for group, notification skipped"
            );
            return Ok(false);
        }

        let notice = BookingNotice {
            first_names: audience.first_names,
            entries: group.entries(),
            payment_reference: group
                .submissions
                .first()
                .map(|s| s.payment_reference.clone())
                .unwrap_or_default(),
            amount: format_amount(group.total_amount()),
            received_amount: received_amount.map(format_amount),
            pay_by: group.earliest_pay_by().map(|s| s.pay_by_date.date_naive()),
            notes,
        };
        self.dispatcher
            .send(
                &audience.recipients,
                template,
                &NotificationData::Booking(notice),
            )
            .await?;
        Ok(true)
    }
}
