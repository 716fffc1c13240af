//! Durable JSON snapshot store
//!
//! The command-line passes run as separate processes, so state must outlive each one.
//! `JsonFileStore` keeps the working set in a [`MemoryStore`] and rewrites a JSON
//! array snapshot after every successful write. The snapshot is written to a
//! temporary file and renamed over the old one, so a crash leaves either the old or
//! the new snapshot, never a torn file.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{Cursor, KeyCondition, MemoryStore, Page, Record, RecordStore, StoreResult};

/// Record store persisted as a JSON array on disk
#[derive(Debug)]
pub struct JsonFileStore<R: Record> {
    path: PathBuf,
    inner: MemoryStore<R>,
    /// Serializes snapshot writes
    write_lock: Mutex<()>,
}

impl<R> JsonFileStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    /// Open the snapshot at `path`, starting empty when the file does not exist
    ///
    /// # Errors
    ///
    /// * `StoreError::Io` if the file exists but cannot be read
    /// * `StoreError::Serialization` if its contents are not a JSON array of records
    pub async fn open(path: impl AsRef<Path>, page_size: usize) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records: Vec<R> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };

        tracing::debug!(path = %path.display(), records = records.len(), "opened record file");
        Ok(Self {
            path,
            inner: MemoryStore::from_records(records, page_size),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records ordered by id
    pub fn snapshot(&self) -> Vec<R> {
        self.inner.snapshot()
    }

    async fn persist(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec_pretty(&self.inner.snapshot())?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl<R> RecordStore<R> for JsonFileStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    async fn put(&self, record: R) -> StoreResult<()> {
        self.inner.put(record).await?;
        self.persist().await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        self.inner.get(id).await
    }

    async fn scan_page(&self, start: Option<Cursor>) -> StoreResult<Page<R>> {
        self.inner.scan_page(start).await
    }

    async fn query_page(
        &self,
        index: &str,
        condition: &KeyCondition,
        start: Option<Cursor>,
    ) -> StoreResult<Page<R>> {
        self.inner.query_page(index, condition, start).await
    }

    async fn update(&self, id: &str, record: &R) -> StoreResult<()> {
        self.inner.update(id, record).await?;
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, StoreError};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn member(number: &str, email: &str) -> Member {
        Member {
            membership_number: number.to_string(),
            first_name: "Jo".to_string(),
            last_name: "Rider".to_string(),
            email: email.to_string(),
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            valid_to: NaiveDate::from_ymd_opt(2025, 12, 31),
            membership_type: "Senior".to_string(),
            membership_status: "Active".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store: JsonFileStore<Member> =
            JsonFileStore::open(dir.path().join("members.json"), 10).await.unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("members.json");

        {
            let store = JsonFileStore::open(&path, 10).await.unwrap();
            store.put(member("M1", "jo@example.com")).await.unwrap();
            store.update("M2", &member("M2", "sam@example.com")).await.unwrap();
        }

        let reopened: JsonFileStore<Member> = JsonFileStore::open(&path, 10).await.unwrap();
        let numbers: Vec<String> = reopened
            .snapshot()
            .into_iter()
            .map(|m| m.membership_number)
            .collect();
        assert_eq!(numbers, vec!["M1", "M2"]);
        assert!(!dir.path().join("members.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("members.json");
        std::fs::write(&path, "{not json").unwrap();

        let result: StoreResult<JsonFileStore<Member>> = JsonFileStore::open(&path, 10).await;
        assert!(matches!(result, Err(StoreError::Serialization { .. })));
    }
}
