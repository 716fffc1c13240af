//! Decoded booking requests
//!
//! A booking request arrives from the form provider already decoded (webhook and API
//! payload decoding happens upstream). One request carries one or more entries, each
//! of which becomes a [`Submission`](super::Submission).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::BookingError;

/// One entry of a booking request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEntry {
    pub membership_number: String,

    pub horse_name: String,

    pub venue: String,

    /// Session start
    pub training_date: DateTime<Utc>,

    /// Price of the entry in minor currency units
    pub amount_due: i64,

    /// Whether the member claimed a current membership
    pub requested_current_membership: bool,
}

/// A decoded multi-entry booking request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// External submission id assigned by the form provider
    pub submission_id: String,

    pub request_date: DateTime<Utc>,

    /// Reference the member must quote on the bank transfer
    pub payment_reference: String,

    pub entries: Vec<BookingEntry>,
}

impl BookingRequest {
    /// Reject requests intake cannot turn into submissions
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.submission_id.trim().is_empty() {
            return Err(BookingError::malformed_request(
                &self.submission_id,
                "missing submission id",
            ));
        }
        if self.entries.is_empty() {
            return Err(BookingError::EmptyRequest {
                submission_id: self.submission_id.clone(),
            });
        }
        if let Some(entry) = self.entries.iter().find(|e| e.amount_due < 0) {
            return Err(BookingError::malformed_request(
                &self.submission_id,
                &format!("negative amount {} for {}", entry.amount_due, entry.horse_name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(amount_due: i64) -> BookingEntry {
        BookingEntry {
            membership_number: "M1".to_string(),
            horse_name: "Comet".to_string(),
            venue: "Arena".to_string(),
            training_date: Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap(),
            amount_due,
            requested_current_membership: true,
        }
    }

    fn request(entries: Vec<BookingEntry>) -> BookingRequest {
        BookingRequest {
            submission_id: "5001".to_string(),
            request_date: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            payment_reference: "ABCD".to_string(),
            entries,
        }
    }

    #[test]
    fn test_validate_accepts_two_entries() {
        assert!(request(vec![entry(2000), entry(1500)]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let err = request(vec![]).validate().unwrap_err();
        assert!(matches!(err, BookingError::EmptyRequest { .. }));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let err = request(vec![entry(-1)]).validate().unwrap_err();
        assert!(matches!(err, BookingError::MalformedRequest { .. }));
    }

    #[test]
    fn test_deserializes_from_json() {
        let json = r#"{
            "submission_id": "6001",
            "request_date": "2025-06-01T09:00:00Z",
            "payment_reference": "WXYZ",
            "entries": [{
                "membership_number": "M9",
                "horse_name": "Storm",
                "venue": "Field",
                "training_date": "2025-06-10T18:00:00Z",
                "amount_due": 2500,
                "requested_current_membership": false
            }]
        }"#;
        let parsed: BookingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].amount_due, 2500);
    }
}
