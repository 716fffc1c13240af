//! Shared fixtures for engine unit tests

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use super::context::EngineContext;
use super::group::GroupResolver;
use super::notify::RecordingDispatcher;
use crate::config::{EngineConfig, StoreConfig};
use crate::store::{MemberTable, MemoryStore, RecordStore, SubmissionTable, TransactionTable};
use crate::types::{
    submission_id, BookingEntry, BookingRequest, Member, Submission, SubmissionState, Transaction,
    CREDIT_TYPE,
};

pub const OPERATOR: &str = "ops@club.example";

/// Pass clock used throughout the engine tests
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 5, 12, 0, 0).unwrap()
}

pub fn training_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap()
}

pub fn request_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

/// Member valid for the whole of 2025, email `<first>@example.com`
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

/// Confirmed, unpaid, single-entry submission
pub fn submission(external_id: &str, index: usize, membership_number: &str) -> Submission {
    let id = submission_id(external_id, index);
    Submission {
        id: id.clone(),
        state: SubmissionState::Received,
        training_date: training_date(),
        pay_by_date: training_date() - Duration::hours(48),
        request_date: request_date(),
        membership_number: membership_number.to_string(),
        venue: "Arena".to_string(),
        horse_name: "Comet".to_string(),
        amount_due: 2000,
        payment_reference: "ABCD".to_string(),
        linked_submission_ids: vec![id],
        requested_current_membership: true,
        actual_current_membership: true,
        found_member_record: true,
        lapsed_membership: false,
        received_request_email_sent: true,
        pay_reminder_email_sent: false,
        payment_discrepancy: false,
        payment_record_id: None,
        expire_at: None,
    }
}

pub fn entry(membership_number: &str, amount_due: i64) -> BookingEntry {
    BookingEntry {
        membership_number: membership_number.to_string(),
        horse_name: "Comet".to_string(),
        venue: "Arena".to_string(),
        training_date: training_date(),
        amount_due,
        requested_current_membership: true,
    }
}

pub fn request(external_id: &str, entries: Vec<BookingEntry>) -> BookingRequest {
    BookingRequest {
        submission_id: external_id.to_string(),
        request_date: request_date(),
        payment_reference: "ABCD".to_string(),
        entries,
    }
}

pub fn credit(date: NaiveDate, description: &str, amount: i64) -> Transaction {
    Transaction {
        id: String::new(),
        date,
        type_code: CREDIT_TYPE.to_string(),
        description: description.to_string(),
        first_name: "Jo".to_string(),
        last_name: "Rider".to_string(),
        amount,
        balance: 100000,
        expire_at: None,
    }
    .with_fingerprint()
}

/// In-memory stores, a recording dispatcher and default rules
pub struct Fixture {
    pub member_store: Arc<MemoryStore<Member>>,
    pub submission_store: Arc<MemoryStore<Submission>>,
    pub transaction_store: Arc<MemoryStore<Transaction>>,
    pub members: MemberTable,
    pub submissions: SubmissionTable,
    pub transactions: TransactionTable,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub config: EngineConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let store_config = StoreConfig::default();
        let member_store: Arc<MemoryStore<Member>> = Arc::new(MemoryStore::new());
        let submission_store: Arc<MemoryStore<Submission>> = Arc::new(MemoryStore::with_page_size(3));
        let transaction_store: Arc<MemoryStore<Transaction>> = Arc::new(MemoryStore::new());
        Self {
            members: MemberTable::new(member_store.clone(), &store_config),
            submissions: SubmissionTable::new(submission_store.clone(), &store_config),
            transactions: TransactionTable::new(transaction_store.clone(), &store_config),
            member_store,
            submission_store,
            transaction_store,
            dispatcher: Arc::new(RecordingDispatcher::new()),
            config: EngineConfig::with_operator(OPERATOR),
        }
    }

    pub fn context(&self) -> EngineContext {
        EngineContext {
            members: self.members.clone(),
            submissions: self.submissions.clone(),
            transactions: self.transactions.clone(),
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
        }
    }

    pub fn resolver(&self) -> GroupResolver {
        GroupResolver::new(self.submissions.clone(), self.members.clone())
    }

    pub async fn add_member(&self, member: Member) {
        self.member_store.put(member).await.unwrap();
    }

    pub async fn add_submission(&self, submission: Submission) {
        self.submission_store.put(submission).await.unwrap();
    }

    pub async fn add_transaction(&self, transaction: Transaction) {
        self.transaction_store.put(transaction).await.unwrap();
    }

    pub async fn stored(&self, id: &str) -> Submission {
        self.submissions.get(id).await.unwrap().unwrap()
    }

    /// Two submissions of the same request, cross-linked
    pub fn linked_pair(
        &self,
        external_id: &str,
        first_member: &str,
        second_member: &str,
    ) -> (Submission, Submission) {
        let mut first = submission(external_id, 1, first_member);
        let mut second = submission(external_id, 2, second_member);
        let ids = vec![first.id.clone(), second.id.clone()];
        first.linked_submission_ids = ids.clone();
        second.linked_submission_ids = ids;
        second.horse_name = "Storm".to_string();
        (first, second)
    }
}
