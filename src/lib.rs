//! Club Bookings Library
//! # Overview
//!
//! This library implements the booking side of a riding club's training sessions:
//! it takes in booking requests, tracks each booked entry through its lifecycle,
//! and reconciles bank credits against outstanding bookings by fuzzy-matching
//! payment references.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Member, Submission, Transaction, notifications)
//! - [`config`] - Store tuning and engine rules
//! - [`store`] - Record store abstraction with paging, retries and bulk updates
//! - [`core`] - Business logic components:
//!   - [`core::lifecycle`] - Intake, expiry sweep, reminders, reprocessing
//!   - [`core::reconcile`] - Payment matching
//!   - [`core::matcher`] - Weighted edit distance over description windows
//!   - [`core::roster`] - Session rosters for the operator
//!   - [`core::statement`] - Transactions summary for the operator
//!   - [`core::bookings`] - Facade sequencing the passes
//! - [`io`] - Input files and the notification outbox
//! - [`cli`] / [`runner`] - The binary's argument parsing and pass runner
//!
//! # Submission States
//!
//! - **RECEIVED**: booked, awaiting payment
//! - **PAID**: matched to a bank transaction
//! - **IN_PAST**: the session has started
//! - **DROPPED**: withdrawn after a failed membership check
//!
//! Entries booked together form a linked group. Confirmations, reminders and
//! payment matches always apply to the whole group.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod runner;
pub mod store;
pub mod types;

pub use config::{EngineConfig, StoreConfig};
pub use core::{Bookings, EngineContext, NotificationDispatcher, RecordingDispatcher};
pub use types::{
    BookingError, BookingRequest, Member, NotifyError, StoreError, Submission, SubmissionState,
    Transaction,
};
