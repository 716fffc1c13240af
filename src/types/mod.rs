//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `member`: Club member records and membership validity
//! - `submission`: Booking submissions and their lifecycle states
//! - `transaction`: Bank transactions and their content fingerprint
//! - `request`: Decoded booking requests handed to intake
//! - `notification`: Template keys and structured notification payloads
//! - `error`: Error types for the booking engine

pub mod error;
pub mod member;
pub mod notification;
pub mod request;
pub mod submission;
pub mod transaction;

pub use error::{BookingError, NotifyError, StoreError};
pub use member::{membership_current, Member, MembershipNumber};
pub use notification::{
    format_amount, BookingNotice, NotificationData, PaymentStatus, RequestedLabel, RosterLine,
    SentNotification, SessionEntry, SessionRoster, TemplateKey, TransactionLine,
    TransactionsSummary,
};
pub use request::{BookingEntry, BookingRequest};
pub use submission::{submission_id, Submission, SubmissionId, SubmissionState};
pub use transaction::{Transaction, TransactionId, CREDIT_TYPE};
