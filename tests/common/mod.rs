//! Shared harness for integration tests
//!
//! Builds a `Bookings` engine over in-memory stores and a recording dispatcher,
//! using only the public API.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use club_bookings::core::{Bookings, EngineContext, RecordingDispatcher};
use club_bookings::store::{MemberTable, MemoryStore, SubmissionTable, TransactionTable};
use club_bookings::types::{BookingEntry, CREDIT_TYPE};
use club_bookings::{
    BookingRequest, EngineConfig, Member, StoreConfig, Submission, Transaction,
};
use std::sync::Arc;

pub const OPERATOR: &str = "ops@club.example";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 5, 12, 0, 0).unwrap()
}

pub fn training_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap()
}

pub fn member(number: &str, first_name: &str) -> Member {
    Member {
        membership_number: number.to_string(),
        first_name: first_name.to_string(),
        last_name: "Rider".to_string(),
        email: format!("{}@example.com", first_name.to_lowercase()),
        valid_from: NaiveDate::from_ymd_opt(2025, 1, 1),
        valid_to: NaiveDate::from_ymd_opt(2025, 12, 31),
        membership_type: "Senior".to_string(),
        membership_status: "Active".to_string(),
    }
}

pub fn entry(number: &str, amount_due: i64) -> BookingEntry {
    BookingEntry {
        membership_number: number.to_string(),
        horse_name: "Comet".to_string(),
        venue: "Arena".to_string(),
        training_date: training_date(),
        amount_due,
        requested_current_membership: true,
    }
}

/// Request made four days before the pass clock
pub fn request(external_id: &str, reference: &str, entries: Vec<BookingEntry>) -> BookingRequest {
    BookingRequest {
        submission_id: external_id.to_string(),
        request_date: now() - Duration::days(4),
        payment_reference: reference.to_string(),
        entries,
    }
}

pub fn credit(day: u32, description: &str, amount: i64) -> Transaction {
    Transaction {
        id: String::new(),
        date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
        type_code: CREDIT_TYPE.to_string(),
        description: description.to_string(),
        first_name: "Jo".to_string(),
        last_name: "Rider".to_string(),
        amount,
        balance: 100000,
        expire_at: None,
    }
}

/// Engine over in-memory stores
pub struct Harness {
    pub member_store: Arc<MemoryStore<Member>>,
    pub submission_store: Arc<MemoryStore<Submission>>,
    pub transaction_store: Arc<MemoryStore<Transaction>>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub bookings: Bookings,
}

impl Harness {
    pub fn new() -> Self {
        let store_config = StoreConfig::default();
        let member_store: Arc<MemoryStore<Member>> = Arc::new(MemoryStore::new());
        let submission_store: Arc<MemoryStore<Submission>> =
            Arc::new(MemoryStore::with_page_size(2));
        let transaction_store: Arc<MemoryStore<Transaction>> = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());

        let bookings = Bookings::new(EngineContext {
            members: MemberTable::new(member_store.clone(), &store_config),
            submissions: SubmissionTable::new(submission_store.clone(), &store_config),
            transactions: TransactionTable::new(transaction_store.clone(), &store_config),
            dispatcher: dispatcher.clone(),
            config: EngineConfig::with_operator(OPERATOR),
        });

        Self {
            member_store,
            submission_store,
            transaction_store,
            dispatcher,
            bookings,
        }
    }

    pub async fn with_members(members: Vec<Member>) -> Self {
        let harness = Self::new();
        harness.bookings.import_members(members, now()).await.unwrap();
        harness
    }

    pub fn stored(&self, id: &str) -> Submission {
        self.submission_store
            .snapshot()
            .into_iter()
            .find(|s| s.id == id)
            .unwrap_or_else(|| panic!("submission {} not stored", id))
    }
}
