//! Error types for the booking engine
//!
//! This module defines the errors that can surface from a pass. Errors are kept
//! descriptive because they end up in the operator's logs, never in member-facing mail.
//!
//! # Error Categories
//!
//! - **Store Errors**: contention, exhausted retries, unknown indexes, I/O and serialization
//! - **Notification Errors**: the dispatcher refused a message
//! - **Booking Errors**: malformed intake requests and broken linked groups
//!
//! Validation mismatches (unknown membership number, lapsed membership) are not errors.
//! They are recorded as submission flags and routed to an operator notification.

use thiserror::Error;

/// Errors raised by a record store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The backend reported a capacity or contention failure for this record
    ///
    /// This is the only retryable store error.
    #[error("Contention while writing record {id}")]
    Contention {
        /// Record id that was being written
        id: String,
    },

    /// Every retry attempt hit contention
    #[error("Update of record {id} failed after {attempts} attempts")]
    RetriesExhausted {
        /// Record id that was being written
        id: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// The backend refused the write outright
    #[error("Write of record {id} rejected: {message}")]
    Rejected {
        /// Record id that was being written
        id: String,
        /// Backend message
        message: String,
    },

    /// The query named an index the record type does not declare
    #[error("Unknown index '{index}'")]
    UnknownIndex {
        /// Index name used by the caller
        index: String,
    },

    /// I/O error from a durable backend
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// A snapshot could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error
        message: String,
    },
}

impl StoreError {
    /// Whether the retrying update path should try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Contention { .. })
    }

    /// Create a Contention error
    pub fn contention(id: &str) -> Self {
        StoreError::Contention { id: id.to_string() }
    }

    /// Create a RetriesExhausted error
    pub fn retries_exhausted(id: &str, attempts: u32) -> Self {
        StoreError::RetriesExhausted {
            id: id.to_string(),
            attempts,
        }
    }

    /// Create a Rejected error
    pub fn rejected(id: &str, message: &str) -> Self {
        StoreError::Rejected {
            id: id.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an UnknownIndex error
    pub fn unknown_index(index: &str) -> Self {
        StoreError::UnknownIndex {
            index: index.to_string(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Io {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: error.to_string(),
        }
    }
}

/// Errors raised by a notification dispatcher
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotifyError {
    /// The transport refused the message
    #[error("Notification '{template}' rejected: {message}")]
    Rejected {
        /// Template key of the refused message
        template: String,
        /// Transport message
        message: String,
    },

    /// The dispatcher cannot accept messages at all
    #[error("Notification channel unavailable: {message}")]
    Unavailable {
        /// What went wrong
        message: String,
    },
}

/// Main error type for booking passes
///
/// Any of these aborts the current pass. Writes completed before the failure stay
/// durable and the next pass picks up the remaining work from persisted flags.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingError {
    /// Record store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Notification dispatch failure
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// A linked submission id resolved to nothing in either the batch or the store
    #[error("Linked submission {id} not found")]
    MissingSubmission {
        /// The dangling submission id
        id: String,
    },

    /// An intake request carried no entries
    #[error("Booking request {submission_id} has no entries")]
    EmptyRequest {
        /// External submission id
        submission_id: String,
    },

    /// An intake request is structurally unusable
    #[error("Malformed booking request {submission_id}: {message}")]
    MalformedRequest {
        /// External submission id
        submission_id: String,
        /// What is wrong with it
        message: String,
    },

    /// A configured time window does not fit the calendar
    #[error("Invalid time window: {message}")]
    InvalidWindow {
        /// Which window and why
        message: String,
    },
}

impl BookingError {
    /// Create a MissingSubmission error
    pub fn missing_submission(id: &str) -> Self {
        BookingError::MissingSubmission { id: id.to_string() }
    }

    /// Create a MalformedRequest error
    pub fn malformed_request(submission_id: &str, message: &str) -> Self {
        BookingError::MalformedRequest {
            submission_id: submission_id.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an InvalidWindow error
    pub fn invalid_window(message: &str) -> Self {
        BookingError::InvalidWindow {
            message: message.to_string(),
        }
    }
}
