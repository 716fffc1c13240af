//! Club member records
//!
//! Members are replaced wholesale on every import and are read-only to the booking
//! engine. The only derived fact the engine needs is whether a membership is current
//! on a given training date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Externally assigned membership number, the member's identity
pub type MembershipNumber = String;

/// A club member as imported from the membership system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Stable, externally assigned membership number
    pub membership_number: MembershipNumber,

    pub first_name: String,

    pub last_name: String,

    /// Contact address notifications are sent to
    pub email: String,

    /// First day the membership is valid (inclusive)
    pub valid_from: Option<NaiveDate>,

    /// Last day the membership is valid (inclusive)
    pub valid_to: Option<NaiveDate>,

    #[serde(default)]
    pub membership_type: String,

    #[serde(default)]
    pub membership_status: String,
}

impl Member {
    /// Whether this membership covers the calendar day of `training_date`
    pub fn is_current_on(&self, training_date: DateTime<Utc>) -> bool {
        membership_current(
            self.valid_from,
            self.valid_to,
            Some(training_date.date_naive()),
        )
    }

    /// "First Last", used in rosters
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Membership validity check with inclusive bounds
///
/// Returns false when either bound or the target is absent.
pub fn membership_current(
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    target: Option<NaiveDate>,
) -> bool {
    match (valid_from, valid_to, target) {
        (Some(from), Some(to), Some(target)) => from <= target && target <= to,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn day(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[rstest]
    #[case::inside(day(2025, 1, 1), day(2025, 12, 31), day(2025, 6, 1), true)]
    #[case::first_day(day(2025, 1, 1), day(2025, 12, 31), day(2025, 1, 1), true)]
    #[case::last_day(day(2025, 1, 1), day(2025, 12, 31), day(2025, 12, 31), true)]
    #[case::before(day(2025, 1, 1), day(2025, 12, 31), day(2024, 12, 31), false)]
    #[case::after(day(2025, 1, 1), day(2025, 12, 31), day(2026, 1, 1), false)]
    #[case::no_start(None, day(2025, 12, 31), day(2025, 6, 1), false)]
    #[case::no_end(day(2025, 1, 1), None, day(2025, 6, 1), false)]
    #[case::no_target(day(2025, 1, 1), day(2025, 12, 31), None, false)]
    fn test_membership_current(
        #[case] from: Option<NaiveDate>,
        #[case] to: Option<NaiveDate>,
        #[case] target: Option<NaiveDate>,
        #[case] expected: bool,
    ) {
        assert_eq!(membership_current(from, to, target), expected);
    }

    #[test]
    fn test_is_current_on_uses_training_day() {
        let member = Member {
            membership_number: "M1".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Rider".to_string(),
            email: "jo@example.com".to_string(),
            valid_from: day(2025, 1, 1),
            valid_to: day(2025, 3, 31),
            membership_type: String::new(),
            membership_status: String::new(),
        };

        // Late evening on the last valid day still counts
        let late = Utc.with_ymd_and_hms(2025, 3, 31, 21, 30, 0).unwrap();
        assert!(member.is_current_on(late));

        let next_morning = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        assert!(!member.is_current_on(next_morning));
        assert_eq!(member.full_name(), "Jo Rider");
    }
}
