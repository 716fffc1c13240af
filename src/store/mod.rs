//! Durable record store
//!
//! This module provides a generic repository over identifiable records:
//! - `Record` - per-type key, index and merge rules
//! - `RecordStore` - the backend seam (single-page reads, single-attempt writes)
//! - `Table` - what callers use: lazy paged streams, retrying update, bounded bulk update
//! - `memory` / `file` - DashMap-backed and JSON-snapshot backends
//! - `members` / `submissions` / `transactions` - typed tables for the booking domain
//!
//! # Pagination
//!
//! Backends return one page at a time with a continuation cursor. `Table` stitches the
//! pages into a single stream; page boundaries carry no meaning for callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::StoreError;

pub mod file;
pub mod members;
pub mod memory;
pub mod retry;
pub mod submissions;
pub mod table;
pub mod transactions;

pub use file::JsonFileStore;
pub use members::MemberTable;
pub use memory::MemoryStore;
pub use retry::RetryPolicy;
pub use submissions::SubmissionTable;
pub use table::{BulkReport, Table};
pub use transactions::TransactionTable;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A record shape the store can hold
///
/// Key handling is explicit per type: `merge_from` must never touch key fields, and
/// decides on its own which attributes an update may leave unspecified.
pub trait Record: Clone + Send + Sync + 'static {
    /// Primary key
    fn id(&self) -> &str;

    /// Apply an update's attributes onto the stored record, keys excluded
    fn merge_from(&mut self, update: &Self);

    /// Secondary indexes this record type supports
    fn indexes() -> &'static [&'static str] {
        &[]
    }

    /// The record's key in `index`, or None when it does not appear there
    fn index_key(&self, _index: &str) -> Option<IndexKey> {
        None
    }
}

/// Position of a record inside a secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub partition: String,
    pub sort: DateTime<Utc>,
}

/// Key condition for an index query: one partition, optional sort-key range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    pub partition: String,
    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub before: Option<DateTime<Utc>>,
}

impl KeyCondition {
    /// Match every record in `partition`
    pub fn partition(partition: &str) -> Self {
        Self {
            partition: partition.to_string(),
            since: None,
            before: None,
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn matches(&self, key: &IndexKey) -> bool {
        key.partition == self.partition
            && self.since.is_none_or(|since| key.sort >= since)
            && self.before.is_none_or(|before| key.sort < before)
    }
}

/// Last key seen, where the next page resumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Sort key of the last record (index queries only)
    pub sort: Option<DateTime<Utc>>,
    pub id: String,
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// Present when more pages follow
    pub next: Option<Cursor>,
}

/// Storage backend for one record type
///
/// Reads return a single page; writes make a single attempt. Retries and page
/// stitching live in [`Table`].
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Insert or overwrite a record wholesale
    async fn put(&self, record: R) -> StoreResult<()>;

    /// Fetch by id; a missing id is `Ok(None)`, not an error
    async fn get(&self, id: &str) -> StoreResult<Option<R>>;

    /// One page of a full scan, ordered by id
    async fn scan_page(&self, start: Option<Cursor>) -> StoreResult<Page<R>>;

    /// One page of an index query, ordered by sort key then id
    async fn query_page(
        &self,
        index: &str,
        condition: &KeyCondition,
        start: Option<Cursor>,
    ) -> StoreResult<Page<R>>;

    /// Merge `record`'s attributes into the stored record with `id`, creating it if absent
    ///
    /// May fail with [`StoreError::Contention`], which callers treat as retryable.
    async fn update(&self, id: &str, record: &R) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(partition: &str, day: u32) -> IndexKey {
        IndexKey {
            partition: partition.to_string(),
            sort: Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_key_condition_bounds() {
        let since = Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let condition = KeyCondition::partition("RECEIVED").since(since).before(before);

        assert!(condition.matches(&key("RECEIVED", 5)));
        assert!(condition.matches(&key("RECEIVED", 9)));
        assert!(!condition.matches(&key("RECEIVED", 4)));
        assert!(!condition.matches(&key("RECEIVED", 10)));
        assert!(!condition.matches(&key("PAID", 6)));
    }

    #[test]
    fn test_partition_only_matches_everything_in_partition() {
        let condition = KeyCondition::partition("PAID");
        assert!(condition.matches(&key("PAID", 1)));
        assert!(condition.matches(&key("PAID", 30)));
    }
}
