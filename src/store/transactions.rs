//! Transaction source
//!
//! Transactions are keyed by their content fingerprint and indexed by
//! `(type_code, date)` so reconciliation only reads recent credits.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::TryStreamExt;
use std::sync::Arc;

use super::{BulkReport, IndexKey, KeyCondition, Record, RecordStore, StoreResult, Table};
use crate::config::StoreConfig;
use crate::types::Transaction;

/// Partition: type code, sort: statement date
pub const TYPE_DATE_INDEX: &str = "TypeDateIndex";

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl Record for Transaction {
    fn id(&self) -> &str {
        &self.id
    }

    fn merge_from(&mut self, update: &Self) {
        self.date = update.date;
        self.type_code = update.type_code.clone();
        self.description = update.description.clone();
        self.first_name = update.first_name.clone();
        self.last_name = update.last_name.clone();
        self.amount = update.amount;
        self.balance = update.balance;
        if update.expire_at.is_some() {
            self.expire_at = update.expire_at;
        }
    }

    fn indexes() -> &'static [&'static str] {
        &[TYPE_DATE_INDEX]
    }

    fn index_key(&self, index: &str) -> Option<IndexKey> {
        (index == TYPE_DATE_INDEX).then(|| IndexKey {
            partition: self.type_code.clone(),
            sort: start_of_day(self.date),
        })
    }
}

/// Bank transaction storage
#[derive(Clone)]
pub struct TransactionTable {
    table: Table<Transaction>,
}

impl TransactionTable {
    pub fn new(store: Arc<dyn RecordStore<Transaction>>, config: &StoreConfig) -> Self {
        Self {
            table: Table::new(store, config),
        }
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Transaction>> {
        self.table.get(id).await
    }

    /// Transactions of `type_code` dated on or after `since`, oldest first
    pub async fn query_by_type_since(
        &self,
        type_code: &str,
        since: NaiveDate,
    ) -> StoreResult<Vec<Transaction>> {
        let condition = KeyCondition::partition(type_code).since(start_of_day(since));
        self.table
            .query_by_index(TYPE_DATE_INDEX, condition)
            .try_collect()
            .await
    }

    /// Store transactions under their fingerprint ids
    ///
    /// Re-importing the same statement lines overwrites the existing records.
    pub async fn bulk_upsert(&self, transactions: Vec<Transaction>) -> BulkReport {
        let fingerprinted: Vec<Transaction> = transactions
            .into_iter()
            .map(Transaction::with_fingerprint)
            .collect();
        let report = self.table.bulk_update(fingerprinted).await;
        tracing::info!(
            updated = report.updated,
            failed = report.failed.len(),
            "imported transactions"
        );
        report
    }
}
