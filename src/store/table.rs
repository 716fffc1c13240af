//! Typed table over a record store backend
//!
//! `Table` is what the rest of the crate talks to. It turns single-page backend reads
//! into lazy streams, wraps single-attempt writes in exponential backoff, and fans
//! bulk updates out over a bounded number of in-flight writes.
//!
//! # Architecture
//!
//! ```text
//! Table<R>
//!     ├── Arc<dyn RecordStore<R>>  (backend: memory, JSON file, ...)
//!     ├── StoreConfig              (page size, bulk concurrency)
//!     └── RetryPolicy              (attempt cap, backoff schedule)
//! ```

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::sync::Arc;

use super::{Cursor, KeyCondition, Record, RecordStore, RetryPolicy, StoreResult};
use crate::config::StoreConfig;
use crate::types::StoreError;

/// Outcome of a best-effort bulk update
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BulkReport {
    /// Records written successfully
    pub updated: usize,
    /// Records that could not be written, with the final error
    pub failed: Vec<(String, StoreError)>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Retrying, streaming front for one record type
pub struct Table<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    config: StoreConfig,
    retry: RetryPolicy,
}

impl<R: Record> Clone for Table<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            retry: self.retry,
        }
    }
}

impl<R: Record> Table<R> {
    /// Create a table over `store`
    ///
    /// # Arguments
    ///
    /// * `store` - Backend that performs single-page reads and single-attempt writes
    /// * `config` - Retry and bulk concurrency limits
    pub fn new(store: Arc<dyn RecordStore<R>>, config: &StoreConfig) -> Self {
        Self {
            store,
            config: config.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Insert or overwrite a record
    pub async fn put(&self, record: R) -> StoreResult<()> {
        self.store.put(record).await
    }

    /// Fetch a record; `Ok(None)` when the id is unknown
    pub async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        self.store.get(id).await
    }

    /// Every record, ordered by id
    ///
    /// The stream fetches pages lazily and restarts from the beginning when called
    /// again.
    pub fn scan_all(&self) -> BoxStream<'static, StoreResult<R>> {
        let store = Arc::clone(&self.store);
        // None: exhausted, Some(None): first page, Some(Some(cursor)): resume
        stream::try_unfold(Some(None), move |state: Option<Option<Cursor>>| {
            let store = Arc::clone(&store);
            async move {
                let Some(start) = state else {
                    return Ok(None);
                };
                let page = store.scan_page(start).await?;
                let items = stream::iter(page.items.into_iter().map(Ok::<R, StoreError>));
                Ok::<_, StoreError>(Some((items, page.next.map(Some))))
            }
        })
        .try_flatten()
        .boxed()
    }

    /// Records in `index` matching `condition`, ordered by sort key then id
    pub fn query_by_index(
        &self,
        index: &'static str,
        condition: KeyCondition,
    ) -> BoxStream<'static, StoreResult<R>> {
        let store = Arc::clone(&self.store);
        stream::try_unfold(Some(None), move |state: Option<Option<Cursor>>| {
            let store = Arc::clone(&store);
            let condition = condition.clone();
            async move {
                let Some(start) = state else {
                    return Ok(None);
                };
                let page = store.query_page(index, &condition, start).await?;
                let items = stream::iter(page.items.into_iter().map(Ok::<R, StoreError>));
                Ok::<_, StoreError>(Some((items, page.next.map(Some))))
            }
        })
        .try_flatten()
        .boxed()
    }

    /// Merge `record` into the stored record `id`, retrying on contention
    ///
    /// # Errors
    ///
    /// * `StoreError::RetriesExhausted` when every attempt hit contention
    /// * Any non-retryable backend error, returned on the first occurrence
    pub async fn update(&self, id: &str, record: &R) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            match self.store.update(id, record).await {
                Ok(()) => return Ok(()),
                Err(error) if error.is_retryable() => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        tracing::warn!(record_id = id, attempts = attempt, "retries exhausted");
                        return Err(StoreError::retries_exhausted(id, attempt));
                    }
                    let delay = self.retry.delay(attempt - 1);
                    tracing::debug!(
                        record_id = id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "contention, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Update every record with at most `bulk_concurrency` writes in flight
    ///
    /// Best effort: individual failures are logged and reported, never abort the
    /// batch. Writes complete in no particular order.
    pub async fn bulk_update(&self, records: Vec<R>) -> BulkReport {
        let results: Vec<(String, StoreResult<()>)> = stream::iter(records)
            .map(|record| async move {
                let id = record.id().to_string();
                let result = self.update(&id, &record).await;
                (id, result)
            })
            .buffer_unordered(self.config.bulk_concurrency.max(1))
            .collect()
            .await;

        let mut report = BulkReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.updated += 1,
                Err(error) => {
                    tracing::warn!(record_id = %id, %error, "bulk update failed for record");
                    report.failed.push((id, error));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::tests::Note;
    use crate::store::{MemoryStore, Page};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend whose updates take a while, tracking how many overlap
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryStore<Note>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore<Note> for SlowStore {
        async fn put(&self, record: Note) -> StoreResult<()> {
            self.inner.put(record).await
        }

        async fn get(&self, id: &str) -> StoreResult<Option<Note>> {
            self.inner.get(id).await
        }

        async fn scan_page(&self, start: Option<Cursor>) -> StoreResult<Page<Note>> {
            self.inner.scan_page(start).await
        }

        async fn query_page(
            &self,
            index: &str,
            condition: &KeyCondition,
            start: Option<Cursor>,
        ) -> StoreResult<Page<Note>> {
            self.inner.query_page(index, condition, start).await
        }

        async fn update(&self, id: &str, record: &Note) -> StoreResult<()> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let result = self.inner.update(id, record).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn table_over(store: &Arc<MemoryStore<Note>>) -> Table<Note> {
        Table::new(store.clone(), &StoreConfig::default())
    }

    #[tokio::test]
    async fn test_scan_all_stitches_pages() {
        let store = Arc::new(MemoryStore::<Note>::with_page_size(2));
        for i in 0..7 {
            store.put(Note::new(&format!("n{}", i), "red", 1)).await.unwrap();
        }
        let table = table_over(&store);

        let all: Vec<Note> = table.scan_all().try_collect().await.unwrap();
        assert_eq!(all.len(), 7);

        // restartable
        let again: Vec<Note> = table.scan_all().try_collect().await.unwrap();
        assert_eq!(again, all);
    }

    #[tokio::test]
    async fn test_query_across_pages_respects_range() {
        let store = Arc::new(MemoryStore::<Note>::with_page_size(2));
        for day in 1..=9 {
            store.put(Note::new(&format!("r{}", day), "red", day)).await.unwrap();
        }
        store.put(Note::new("b1", "blue", 5)).await.unwrap();
        let table = table_over(&store);

        let condition = KeyCondition::partition("red").since(Note::when(3)).before(Note::when(8));
        let days: Vec<u32> = table
            .query_by_index("ColourDay", condition)
            .map_ok(|note| note.day)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(days, vec![3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_query_unknown_index_surfaces_error() {
        let table = table_over(&Arc::new(MemoryStore::<Note>::new()));
        let result: StoreResult<Vec<Note>> = table
            .query_by_index("Nope", KeyCondition::partition("red"))
            .try_collect()
            .await;
        assert!(matches!(result, Err(StoreError::UnknownIndex { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_retries_through_contention() {
        let store = Arc::new(MemoryStore::<Note>::new());
        store.inject_contention(3);
        let table = table_over(&store);

        table.update("a", &Note::new("a", "red", 1)).await.unwrap();
        assert_eq!(store.update_attempts(), 4);
        assert!(store.get("a").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_gives_up_after_five_attempts() {
        let store = Arc::new(MemoryStore::<Note>::new());
        store.inject_contention(10);
        let table = table_over(&store);

        let error = table.update("a", &Note::new("a", "red", 1)).await.unwrap_err();
        assert_eq!(error, StoreError::retries_exhausted("a", 5));
        assert_eq!(store.update_attempts(), 5);
    }

    #[tokio::test]
    async fn test_update_does_not_retry_rejection() {
        let store = Arc::new(MemoryStore::<Note>::new());
        store.reject_updates_for("a", "bad attribute");
        let table = table_over(&store);

        let error = table.update("a", &Note::new("a", "red", 1)).await.unwrap_err();
        assert!(matches!(error, StoreError::Rejected { .. }));
        assert_eq!(store.update_attempts(), 1);
    }

    #[tokio::test]
    async fn test_bulk_update_is_best_effort() {
        let store = Arc::new(MemoryStore::<Note>::new());
        store.reject_updates_for("n3", "bad attribute");
        let table = Table::new(store.clone() as Arc<dyn RecordStore<Note>>, &StoreConfig::new(5, 4));

        let notes: Vec<Note> = (0..10).map(|i| Note::new(&format!("n{}", i), "red", 1)).collect();
        let report = table.bulk_update(notes).await;

        assert_eq!(report.updated, 9);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "n3");
        assert!(!report.is_complete());
        assert_eq!(store.len(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_update_bounds_in_flight_writes() {
        let store = Arc::new(SlowStore::default());
        let table = Table::new(store.clone() as Arc<dyn RecordStore<Note>>, &StoreConfig::new(5, 3));

        let notes: Vec<Note> = (0..12).map(|i| Note::new(&format!("n{}", i), "red", 1)).collect();
        let report = table.bulk_update(notes).await;

        assert_eq!(report.updated, 12);
        assert_eq!(store.peak.load(Ordering::SeqCst), 3);
        assert_eq!(store.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.len(), 12);
    }
}
