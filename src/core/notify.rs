//! Notification dispatcher seam
//!
//! The engine never renders or sends mail itself. It hands a recipient list, a
//! template key and a structured payload to a [`NotificationDispatcher`]. Dispatch is
//! fire-and-forget: failures are not retried here and abort the pass that sent them.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::types::{Member, NotificationData, NotifyError, SentNotification, TemplateKey};

/// Outbound notification channel
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Send one notification
    ///
    /// # Arguments
    ///
    /// * `recipients` - Addresses to deliver to
    /// * `template` - Which message to render
    /// * `data` - Payload the template renders
    async fn send(
        &self,
        recipients: &[String],
        template: TemplateKey,
        data: &NotificationData,
    ) -> Result<(), NotifyError>;
}

/// Dispatcher that records every notification instead of sending it
///
/// The command-line binary drains it into the outbox file after each pass; tests read
/// it directly.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentNotification>>,
    /// Template that fails on send, for exercising error paths
    failing: Mutex<Option<TemplateKey>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send of `template` fail
    pub fn fail_on(&self, template: TemplateKey) {
        if let Ok(mut failing) = self.failing.lock() {
            *failing = Some(template);
        }
    }

    /// Copy of everything sent so far
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Drain everything sent so far
    pub fn take(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }

    /// How many notifications used `template`
    pub fn count(&self, template: TemplateKey) -> usize {
        self.sent()
            .iter()
            .filter(|notification| notification.template == template)
            .count()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        recipients: &[String],
        template: TemplateKey,
        data: &NotificationData,
    ) -> Result<(), NotifyError> {
        let should_fail = self
            .failing
            .lock()
            .map(|failing| *failing == Some(template))
            .unwrap_or(false);
        if should_fail {
            return Err(NotifyError::Rejected {
                template: template.to_string(),
                message: "dispatcher configured to fail".to_string(),
            });
        }

        let mut sent = self.sent.lock().map_err(|_| NotifyError::Unavailable {
            message: "outbox lock poisoned".to_string(),
        })?;
        sent.push(SentNotification {
            recipients: recipients.to_vec(),
            template,
            data: data.clone(),
        });
        tracing::debug!(%template, recipients = recipients.len(), "notification recorded");
        Ok(())
    }
}

/// Who a group notification goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audience {
    pub recipients: Vec<String>,
    /// "Jo", "Jo and Sam", "Jo, Sam and Alex"
    pub first_names: String,
}

impl Audience {
    /// Build an audience from the group's member records
    ///
    /// Members sharing a membership number are addressed once; order of first
    /// appearance is kept.
    pub fn from_members<'a>(members: impl IntoIterator<Item = &'a Member>) -> Self {
        let mut seen: Vec<&str> = Vec::new();
        let mut recipients = Vec::new();
        let mut names = Vec::new();

        for member in members {
            if seen.contains(&member.membership_number.as_str()) {
                continue;
            }
            seen.push(&member.membership_number);
            if !recipients.contains(&member.email) {
                recipients.push(member.email.clone());
            }
            names.push(member.first_name.clone());
        }

        Self {
            recipients,
            first_names: join_names(&names),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}
