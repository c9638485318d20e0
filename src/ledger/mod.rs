//! The job ledger: one persistent record per file identity.
//!
//! The ledger is the sole resumption mechanism across process restarts. A
//! record is created on a file's first submission attempt, mutated on every
//! lifecycle event via idempotent upserts that preserve `created_at`, and
//! never deleted — it is an append-via-upsert audit trail spanning runs.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::metrics::{self, UsageMetrics};

pub mod in_memory;
pub mod sqlite;


/// Execution status of one file, as tracked across runs.
///
/// Absence of a ledger record means "never attempted"; there is no stored
/// not-yet-seen variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Submission request about to be sent (or in flight).
    Starting,
    /// Remote processing is asynchronous; a resume handle is held.
    Pending,
    /// Terminal: processed successfully.
    Completed,
    /// Terminal: failed.
    Error,
}

impl ExecutionStatus {
    /// COMPLETED and ERROR are terminal; no further transitions occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Starting => "STARTING",
            ExecutionStatus::Pending => "PENDING",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Error => "ERROR",
        }
    }

    /// Map a remote status string. Anything unrecognized is still in flight
    /// remotely (e.g. "EXECUTING") and maps to `Pending`.
    pub fn from_remote(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STARTING" => ExecutionStatus::Starting,
            "COMPLETED" => ExecutionStatus::Completed,
            "ERROR" => ExecutionStatus::Error,
            _ => ExecutionStatus::Pending,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger row, keyed by file path.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRecord {
    /// Unique, immutable file identity (its path).
    pub file_key: String,
    pub status: ExecutionStatus,
    /// Last payload from the API. Null until the first response arrives and
    /// on intermediate polls; only the terminal row carries the full payload.
    pub result: Option<Value>,
    /// Status-check URL, meaningful only while the record is non-terminal.
    pub resume_handle: Option<String>,
    /// Last observed remote status code.
    pub status_code: Option<i64>,
    /// Wall-clock seconds for the whole attempt; set on the terminal write.
    pub time_taken: Option<f64>,
    pub embedding_cost: Option<f64>,
    pub embedding_tokens: Option<i64>,
    pub llm_cost: Option<f64>,
    pub llm_tokens: Option<i64>,
    /// Set only when `status` is ERROR.
    pub error_message: Option<String>,
    /// Fixed at first write, preserved across every subsequent upsert.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields the lifecycle driver supplies on each write.
///
/// Derived metrics and the error message are computed from `result` by the
/// ledger before the row is stored.
#[derive(Debug, Clone)]
pub struct RecordUpdate {
    pub file_key: String,
    pub status: ExecutionStatus,
    pub result: Option<Value>,
    pub time_taken: Option<f64>,
    pub status_code: Option<i64>,
    pub resume_handle: Option<String>,
}

impl RecordUpdate {
    /// Compute the derived columns for this write. Metrics come from the
    /// payload when one is present; the error message only for ERROR rows.
    pub(crate) fn derived(&self) -> (UsageMetrics, Option<String>) {
        match &self.result {
            Some(result) => {
                let usage = UsageMetrics::from_result(result);
                let error = (self.status == ExecutionStatus::Error)
                    .then(|| metrics::error_message(result));
                (usage, error)
            }
            None => (UsageMetrics::default(), None),
        }
    }
}

/// Persistent store of one record per file key.
///
/// Concurrent workers write to disjoint keys but share one store, so
/// implementations must serialize their own writes; callers never lock
/// externally. Storage errors propagate — they are never masked and never
/// corrupt another file's record.
pub trait Ledger: Send + Sync {
    /// Fetch the record for a file, if one exists.
    fn get(&self, file_key: &str) -> impl Future<Output = Result<Option<LedgerRecord>>> + Send;

    /// Return the stored resume handle only while the record is non-terminal.
    fn resumable_handle(
        &self,
        file_key: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Write or overwrite the record. Insert-or-merge semantics: every field
    /// takes the new value except `created_at`, which is preserved.
    fn upsert(&self, update: RecordUpdate) -> impl Future<Output = Result<()>> + Send;

    /// Aggregate record counts by status, for final reporting.
    fn summary(&self) -> impl Future<Output = Result<BTreeMap<ExecutionStatus, i64>>> + Send;

    /// Full dump for detailed reporting and export.
    fn all_records(&self) -> impl Future<Output = Result<Vec<LedgerRecord>>> + Send;
}
