//! Notification payloads
//!
//! The engine hands the dispatcher a template key and a structured payload. Turning
//! these into mail (templates, MIME, transport) is the dispatcher's business.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Format minor currency units as a two-decimal amount, e.g. `2000` → `"20.00"`
pub fn format_amount(minor_units: i64) -> String {
    Decimal::new(minor_units, 2).to_string()
}

/// Template the dispatcher renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKey {
    /// Booking confirmation with payment instructions
    ReceivedRequest,
    /// Payment is due and has not arrived
    PayReminder,
    /// Payment matched to the booking
    ReceivedPayment,
    /// Booking dropped, please resubmit
    ProblemMessage,
    /// Plain-text alert to the operator
    OperatorAlert,
    /// Per-venue session roster for the operator
    TrainingSummary,
    /// Recent bank lines and the bookings they paid, for the operator
    TransactionsSummary,
}

impl TemplateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKey::ReceivedRequest => "received-request",
            TemplateKey::PayReminder => "pay-reminder",
            TemplateKey::ReceivedPayment => "received-payment",
            TemplateKey::ProblemMessage => "problem-message",
            TemplateKey::OperatorAlert => "operator-alert",
            TemplateKey::TrainingSummary => "training-summary",
            TemplateKey::TransactionsSummary => "transactions-summary",
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One session of a booking group as shown to the member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEntry {
    pub venue: String,
    pub training_date: DateTime<Utc>,
    pub horse_name: String,
}

/// Member-facing notice about a whole linked group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingNotice {
    /// "Jo" or "Jo and Sam"
    pub first_names: String,

    pub entries: Vec<SessionEntry>,

    pub payment_reference: String,

    /// Total requested for the group, formatted
    pub amount: String,

    /// Amount actually received, formatted (payment notices only)
    pub received_amount: Option<String>,

    /// Earliest pay-by date across the group
    pub pay_by: Option<NaiveDate>,

    /// Extra remarks: discrepancies, lapsed membership, drop reasons
    pub notes: Vec<String>,
}

/// How a roster line's payment looks to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    IncorrectPayment,
    NotPaid,
}

/// Recently made requests get flagged on the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedLabel {
    Today,
    Yesterday,
}

/// One rider on a session roster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterLine {
    pub training_date: DateTime<Utc>,
    pub rider: String,
    pub horse_name: String,
    pub payment: PaymentStatus,
    pub requested: Option<RequestedLabel>,
}

/// All riders at one venue on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRoster {
    pub day: NaiveDate,
    pub venue: String,
    pub lines: Vec<RosterLine>,
    pub member_emails: Vec<String>,
}

/// One bank line in the transactions summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionLine {
    pub date: NaiveDate,
    pub type_code: String,
    /// Payer name and description as they appeared on the statement
    pub description: String,
    pub amount: String,
    /// Venue codes of the linked submissions, space separated
    pub venues: String,
    pub balance: String,
    /// "No Payment Found", "Payment Discrepancy, Member M1", ...
    pub notes: Vec<String>,
    /// Payment reference of the linked submissions
    pub reference: String,
}

/// Every recent bank line with the bookings it settled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionsSummary {
    pub since: NaiveDate,
    pub lines: Vec<TransactionLine>,
}

/// Structured payload handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationData {
    Booking(BookingNotice),
    Alert { subject: String, body: String },
    Roster(SessionRoster),
    Transactions(TransactionsSummary),
}

/// A notification as handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentNotification {
    pub recipients: Vec<String>,
    pub template: TemplateKey,
    pub data: NotificationData,
}
