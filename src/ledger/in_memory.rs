//! In-memory ledger implementation.
//!
//! Stores records in a map behind a lock. Suitable for tests and dry runs;
//! records are lost on restart, so it offers no cross-run resumption.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::Result;
use crate::ledger::{ExecutionStatus, Ledger, LedgerRecord, RecordUpdate};

/// Ledger backed by a process-local map.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    records: Arc<RwLock<HashMap<String, LedgerRecord>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for InMemoryLedger {
    async fn get(&self, file_key: &str) -> Result<Option<LedgerRecord>> {
        Ok(self.records.read().get(file_key).cloned())
    }

    async fn resumable_handle(&self, file_key: &str) -> Result<Option<String>> {
        let records = self.records.read();
        let handle = records
            .get(file_key)
            .filter(|record| !record.status.is_terminal())
            .and_then(|record| record.resume_handle.clone());
        Ok(handle)
    }

    async fn upsert(&self, update: RecordUpdate) -> Result<()> {
        let (usage, error_message) = update.derived();
        let now = Utc::now();

        let mut records = self.records.write();
        // Insert-or-merge: every field takes the new value, created_at stays.
        let created_at = records
            .get(&update.file_key)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        records.insert(
            update.file_key.clone(),
            LedgerRecord {
                file_key: update.file_key,
                status: update.status,
                result: update.result,
                resume_handle: update.resume_handle,
                status_code: update.status_code,
                time_taken: update.time_taken,
                embedding_cost: usage.embedding_cost,
                embedding_tokens: usage.embedding_tokens,
                llm_cost: usage.llm_cost,
                llm_tokens: usage.llm_tokens,
                error_message,
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn summary(&self) -> Result<BTreeMap<ExecutionStatus, i64>> {
        let records = self.records.read();
        let mut counts = BTreeMap::new();
        for record in records.values() {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn all_records(&self) -> Result<Vec<LedgerRecord>> {
        let mut records: Vec<LedgerRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.file_key.cmp(&b.file_key));
        Ok(records)
    }
}
