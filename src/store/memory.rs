//! In-memory record store backed by DashMap
//!
//! `MemoryStore` is the reference backend: the engine's tests run against it and
//! `JsonFileStore` layers persistence on top of it. It honours the same paging and
//! ordering contract a remote key-value table would, and can be told to fail writes
//! so the retry and bulk paths can be exercised.
//!
//! # Thread Safety
//!
//! DashMap shards its locking, so concurrent bulk updates to different ids do not
//! block each other. Injected failures are tracked with atomics and a second map.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{Cursor, KeyCondition, Page, Record, RecordStore, StoreResult};
use crate::config::StoreConfig;
use crate::types::StoreError;

/// DashMap-backed record store
#[derive(Debug)]
pub struct MemoryStore<R: Record> {
    records: DashMap<String, R>,
    page_size: usize,
    /// Remaining updates that fail with contention
    contention: AtomicU32,
    /// Ids whose updates are refused, with the refusal message
    rejected: DashMap<String, String>,
    update_attempts: AtomicU32,
}

impl<R: Record> MemoryStore<R> {
    /// Create an empty store with the default page size
    pub fn new() -> Self {
        Self::with_page_size(StoreConfig::default().page_size)
    }

    /// Create an empty store returning at most `page_size` records per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: DashMap::new(),
            page_size: page_size.max(1),
            contention: AtomicU32::new(0),
            rejected: DashMap::new(),
            update_attempts: AtomicU32::new(0),
        }
    }

    /// Create a store preloaded with `records`
    pub fn from_records(records: impl IntoIterator<Item = R>, page_size: usize) -> Self {
        let store = Self::with_page_size(page_size);
        for record in records {
            store.records.insert(record.id().to_string(), record);
        }
        store
    }

    /// Make the next `count` updates fail with [`StoreError::Contention`]
    pub fn inject_contention(&self, count: u32) {
        self.contention.store(count, Ordering::SeqCst);
    }

    /// Refuse every update of `id` with a non-retryable error
    pub fn reject_updates_for(&self, id: &str, message: &str) {
        self.rejected.insert(id.to_string(), message.to_string());
    }

    /// Number of update attempts seen, failed ones included
    pub fn update_attempts(&self) -> u32 {
        self.update_attempts.load(Ordering::SeqCst)
    }

    /// All records ordered by id
    pub fn snapshot(&self) -> Vec<R> {
        let mut records: Vec<R> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.id().cmp(b.id()));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn take_contention(&self) -> bool {
        self.contention
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }

    fn paginate<T, F>(&self, items: Vec<T>, cursor_of: F) -> (Vec<T>, Option<Cursor>)
    where
        F: Fn(&T) -> Cursor,
    {
        let has_more = items.len() > self.page_size;
        let page: Vec<T> = items.into_iter().take(self.page_size).collect();
        let next = if has_more { page.last().map(cursor_of) } else { None };
        (page, next)
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn put(&self, record: R) -> StoreResult<()> {
        self.records.insert(record.id().to_string(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn scan_page(&self, start: Option<Cursor>) -> StoreResult<Page<R>> {
        let remaining: Vec<R> = self
            .snapshot()
            .into_iter()
            .filter(|record| match &start {
                Some(cursor) => record.id() > cursor.id.as_str(),
                None => true,
            })
            .collect();

        let (items, next) = self.paginate(remaining, |record| Cursor {
            sort: None,
            id: record.id().to_string(),
        });
        Ok(Page { items, next })
    }

    async fn query_page(
        &self,
        index: &str,
        condition: &KeyCondition,
        start: Option<Cursor>,
    ) -> StoreResult<Page<R>> {
        if !R::indexes().contains(&index) {
            return Err(StoreError::unknown_index(index));
        }

        let mut matching: Vec<(chrono::DateTime<chrono::Utc>, R)> = self
            .records
            .iter()
            .filter_map(|entry| {
                let key = entry.value().index_key(index)?;
                condition
                    .matches(&key)
                    .then(|| (key.sort, entry.value().clone()))
            })
            .collect();
        matching.sort_by(|(a_sort, a), (b_sort, b)| {
            a_sort.cmp(b_sort).then_with(|| a.id().cmp(b.id()))
        });

        if let Some(cursor) = &start {
            matching.retain(|(sort, record)| {
                let position = (Some(*sort), record.id());
                position > (cursor.sort, cursor.id.as_str())
            });
        }

        let (page, next) = self.paginate(matching, |(sort, record)| Cursor {
            sort: Some(*sort),
            id: record.id().to_string(),
        });
        Ok(Page {
            items: page.into_iter().map(|(_, record)| record).collect(),
            next,
        })
    }

    async fn update(&self, id: &str, record: &R) -> StoreResult<()> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.rejected.get(id) {
            return Err(StoreError::rejected(id, message.value()));
        }
        if self.take_contention() {
            return Err(StoreError::contention(id));
        }

        self.records
            .entry(id.to_string())
            .and_modify(|stored| stored.merge_from(record))
            .or_insert_with(|| record.clone());
        Ok(())
    }
}
