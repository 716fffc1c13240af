//! Bank transaction types
//!
//! Transactions come from bank statement imports. Their identity is a content
//! fingerprint, so importing the same statement twice overwrites rather than
//! duplicates. They are immutable once stored and read-only to reconciliation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::notification::format_amount;

/// Transaction identifier (hex SHA-256 fingerprint)
pub type TransactionId = String;

/// Bank type code for incoming credits
pub const CREDIT_TYPE: &str = "CR";

/// A bank statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Content fingerprint, see [`Transaction::fingerprint`]
    #[serde(default)]
    pub id: TransactionId,

    /// Statement date (banks do not report a time of day)
    pub date: NaiveDate,

    /// Bank type code, e.g. `CR` for credits
    pub type_code: String,

    /// Free text the payer typed, where the payment reference hides
    pub description: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    /// Signed amount in minor currency units
    pub amount: i64,

    /// Account balance after this line, in minor currency units
    pub balance: i64,

    /// Garbage-collection marker for the backing store
    #[serde(default)]
    pub expire_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Transaction {
    /// Stable hash over date, type, description, names, amount and balance
    pub fn fingerprint(&self) -> TransactionId {
        let data = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.date,
            self.type_code,
            self.description,
            self.first_name,
            self.last_name,
            self.amount,
            self.balance
        );
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Replace the id with the content fingerprint
    pub fn with_fingerprint(mut self) -> Self {
        self.id = self.fingerprint();
        self
    }

    pub fn is_credit(&self) -> bool {
        self.type_code == CREDIT_TYPE
    }

    /// Payer name followed by the description, as the statement printed it
    pub fn full_description(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        match (name.is_empty(), self.description.is_empty()) {
            (_, true) => name.to_string(),
            (true, false) => self.description.clone(),
            (false, false) => format!("{} {}", name, self.description),
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} {} | {} | Amount: {} | Balance: {}",
            self.date,
            self.type_code,
            self.first_name,
            self.last_name,
            self.description,
            format_amount(self.amount),
            format_amount(self.balance)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            id: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            type_code: CREDIT_TYPE.to_string(),
            description: "J RIDER ABCD".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Rider".to_string(),
            amount: 2000,
            balance: 152000,
            expire_at: None,
        }
    }

    #[test]
    fn test_fingerprint_is_stable_and_hex() {
        let a = sample().fingerprint();
        let b = sample().fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_ignores_id_and_expiry() {
        let mut other = sample();
        other.id = "something".to_string();
        other.expire_at = Some(chrono::Utc::now());
        assert_eq!(other.fingerprint(), sample().fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let mut other = sample();
        other.balance += 1;
        assert_ne!(other.fingerprint(), sample().fingerprint());
    }

    #[rstest::rstest]
    #[case::both("Jo", "Rider", "ABCD", "Jo Rider ABCD")]
    #[case::no_name("", "", "ABCD", "ABCD")]
    #[case::first_name_only("Jo", "", "ABCD", "Jo ABCD")]
    #[case::no_description("Jo", "Rider", "", "Jo Rider")]
    fn test_full_description(
        #[case] first: &str,
        #[case] last: &str,
        #[case] description: &str,
        #[case] expected: &str,
    ) {
        let mut line = sample();
        line.first_name = first.to_string();
        line.last_name = last.to_string();
        line.description = description.to_string();
        assert_eq!(line.full_description(), expected);
    }

    #[test]
    fn test_display() {
        let line = sample().to_string();
        assert_eq!(
            line,
            "2025-05-02 | CR | Jo Rider | J RIDER ABCD | Amount: 20.00 | Balance: 1520.00"
        );
        assert!(sample().is_credit());
    }
}
