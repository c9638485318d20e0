//! Resumable, concurrent batch driver for asynchronous document-processing APIs.
//!
//! This crate submits a folder of files to a remote API, tracks each file
//! through a submit/poll lifecycle, and persists every transition to a
//! per-file ledger so an interrupted batch resumes without duplicate work:
//! - Per-file state machine: STARTING -> PENDING -> COMPLETED | ERROR
//! - Idempotent ledger upserts keyed by file path, `created_at` preserved
//! - Skip/retry policy over prior outcomes (`--retry-failed`, `--skip-pending`, ...)
//! - Bounded worker pool with live progress and run totals
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use docbatch::{run_batch, list_files, ReqwestApiClient, SqliteLedger};
//!
//! let ledger = Arc::new(SqliteLedger::open(&db_path).await?);
//! let client = Arc::new(ReqwestApiClient::new(&endpoint, &api_key, timeout)?);
//! let files = list_files(&folder, false)?;
//!
//! let totals = run_batch(files, config, client, ledger).await;
//! println!("succeeded: {}", totals.succeeded);
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod policy;
pub mod report;

// Re-export commonly used types
pub use client::{ApiClient, MockApiClient, ReqwestApiClient, StatusResponse, SubmitOutcome};
pub use config::{Args, BatchConfig, SkipFlags};
pub use dispatcher::{list_files, run_batch, RunTotals};
pub use driver::{process_file, FileOutcome};
pub use error::{DocbatchError, Result};
pub use ledger::in_memory::InMemoryLedger;
pub use ledger::sqlite::SqliteLedger;
pub use ledger::{ExecutionStatus, Ledger, LedgerRecord, RecordUpdate};
pub use metrics::UsageMetrics;
