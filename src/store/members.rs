//! Member source
//!
//! Members are keyed by membership number and replaced wholesale on import, so the
//! merge rule overwrites every attribute.

use futures::TryStreamExt;
use std::sync::Arc;

use super::{BulkReport, Record, RecordStore, StoreResult, Table};
use crate::config::StoreConfig;
use crate::types::Member;

impl Record for Member {
    fn id(&self) -> &str {
        &self.membership_number
    }

    fn merge_from(&mut self, update: &Self) {
        let Member {
            membership_number: _,
            first_name,
            last_name,
            email,
            valid_from,
            valid_to,
            membership_type,
            membership_status,
        } = update.clone();
        self.first_name = first_name;
        self.last_name = last_name;
        self.email = email;
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self.membership_type = membership_type;
        self.membership_status = membership_status;
    }
}

/// Read access by membership number plus wholesale import
#[derive(Clone)]
pub struct MemberTable {
    table: Table<Member>,
}

impl MemberTable {
    pub fn new(store: Arc<dyn RecordStore<Member>>, config: &StoreConfig) -> Self {
        Self {
            table: Table::new(store, config),
        }
    }

    /// Look up a member; `Ok(None)` for an unknown number
    pub async fn get(&self, membership_number: &str) -> StoreResult<Option<Member>> {
        self.table.get(membership_number).await
    }

    /// Upsert every imported member
    pub async fn bulk_replace(&self, members: Vec<Member>) -> BulkReport {
        let report = self.table.bulk_update(members).await;
        tracing::info!(
            updated = report.updated,
            failed = report.failed.len(),
            "imported members"
        );
        report
    }

    /// Every member, ordered by membership number
    pub async fn all(&self) -> StoreResult<Vec<Member>> {
        self.table.scan_all().try_collect().await
    }
}
