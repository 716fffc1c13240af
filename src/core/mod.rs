//! Core business logic module
//!
//! This module contains the booking engine components:
//! - `matcher` - Fuzzy payment reference matching
//! - `notify` - Notification dispatcher seam and a recording implementation
//! - `group` - Linked submission groups and their resolution
//! - `context` - Store tables, dispatcher and rules shared by every pass
//! - `lifecycle` - Intake, expiry sweep, reminders, reprocessing and recovery
//! - `reconcile` - Matching bank credits to outstanding submissions
//! - `roster` - Per-session rosters for the operator
//! - `statement` - Monthly transactions summary for the operator
//! - `bookings` - Facade sequencing the passes

pub mod bookings;
pub mod context;
pub mod group;
pub mod lifecycle;
pub mod matcher;
pub mod notify;
pub mod reconcile;
pub mod roster;
pub mod statement;

#[cfg(test)]
pub(crate) mod testing;

pub use bookings::{Bookings, HourlyReport, MemberImport, TransactionImport};
pub use context::EngineContext;
pub use group::{GroupResolver, SubmissionBatch, SubmissionGroup};
pub use lifecycle::{BookingLifecycle, IntakeOutcome, ReprocessReport, StaticFeed, SubmissionFeed};
pub use matcher::distance;
pub use notify::{Audience, NotificationDispatcher, RecordingDispatcher};
pub use reconcile::{PaymentMatch, PaymentReconciler, ReconcileReport};
pub use roster::SessionRosterBuilder;
pub use statement::TransactionsSummaryBuilder;
