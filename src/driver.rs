//! File lifecycle driver.
//!
//! Drives one file from "not yet submitted" (or "resume from pending") to a
//! terminal state: STARTING -> PENDING -> {COMPLETED | ERROR}, or straight to
//! terminal when the API resolves synchronously. Every transition is written
//! to the ledger before the next step begins, which is what makes a killed
//! run resumable.

use std::path::Path;
use std::time::Instant;

use serde_json::{json, Value};

use crate::client::{ApiClient, SubmitOutcome};
use crate::config::BatchConfig;
use crate::error::{DocbatchError, Result};
use crate::ledger::{ExecutionStatus, Ledger, RecordUpdate};
use crate::policy;

/// What happened to one file in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Succeeded,
    Failed,
    Skipped,
}

/// Where the state machine ended up, before the terminal ledger write.
struct Terminal {
    status: ExecutionStatus,
    payload: Option<Value>,
    status_code: Option<i64>,
    resume_handle: Option<String>,
}

/// Process one file to a terminal outcome.
///
/// API client errors never escape: they become a terminal ERROR row and a
/// `Failed` outcome. Ledger errors do escape — a broken store is not a
/// per-file condition.
#[tracing::instrument(skip_all, fields(file = %file_path.display()))]
pub async fn process_file<C, L>(
    file_path: &Path,
    config: &BatchConfig,
    client: &C,
    ledger: &L,
) -> Result<FileOutcome>
where
    C: ApiClient,
    L: Ledger,
{
    let file_key = file_path.to_string_lossy().into_owned();
    tracing::info!("processing started");

    let existing = ledger.get(&file_key).await?;
    let existing_status = existing.map(|record| record.status);
    if let Some(reason) = policy::skip_reason(existing_status, &config.flags) {
        tracing::warn!(reason, "skipping processing");
        return Ok(FileOutcome::Skipped);
    }

    // Elapsed time restarts here; a file resumed from a previous run's
    // PENDING row reports only this run's polling time.
    let started = Instant::now();

    let terminal = match advance(&file_key, file_path, config, client, ledger).await {
        Ok(terminal) => terminal,
        Err(e) if e.is_fatal_to_attempt() => return Err(e),
        Err(e) => {
            tracing::error!(error = %e, "error while processing file");
            Terminal {
                status: ExecutionStatus::Error,
                payload: Some(json!({ "error": e.to_string() })),
                status_code: None,
                resume_handle: None,
            }
        }
    };

    let time_taken = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
    let status = terminal.status;
    ledger
        .upsert(RecordUpdate {
            file_key: file_key.clone(),
            status,
            result: terminal.payload,
            time_taken: Some(time_taken),
            status_code: terminal.status_code,
            resume_handle: terminal.resume_handle,
        })
        .await?;

    tracing::info!(status = %status, time_taken, "processing completed");
    Ok(match status {
        ExecutionStatus::Completed => FileOutcome::Succeeded,
        _ => FileOutcome::Failed,
    })
}

/// Run resume-or-submit plus the poll loop until the remote status is
/// terminal. The terminal ledger write stays with the caller so the exception
/// path and the happy path share it.
async fn advance<C, L>(
    file_key: &str,
    file_path: &Path,
    config: &BatchConfig,
    client: &C,
    ledger: &L,
) -> Result<Terminal>
where
    C: ApiClient,
    L: Ledger,
{
    // retry_pending discards any stored handle, forcing a fresh submission.
    let mut resume_handle = if config.flags.retry_pending {
        None
    } else {
        ledger.resumable_handle(file_key).await?
    };

    let mut status;
    let mut status_code = None;
    let mut payload = None;

    match resume_handle.clone() {
        Some(handle) => {
            // Resuming costs no API call and no ledger write.
            tracing::info!(handle = %handle, "using existing status endpoint");
            status = ExecutionStatus::Pending;
        }
        None => {
            ledger
                .upsert(RecordUpdate {
                    file_key: file_key.to_string(),
                    status: ExecutionStatus::Starting,
                    result: None,
                    time_taken: None,
                    status_code: None,
                    resume_handle: None,
                })
                .await?;

            match client.submit(file_path).await? {
                SubmitOutcome::Resolved {
                    status: resolved,
                    status_code: code,
                    response,
                } => {
                    status = resolved;
                    status_code = code;
                    payload = Some(response);
                }
                SubmitOutcome::Pending {
                    resume_handle: handle,
                    status_code: code,
                    response,
                } => {
                    status = ExecutionStatus::Pending;
                    status_code = code;
                    payload = Some(response);
                    resume_handle = Some(handle);
                }
            }
            tracing::debug!(status = %status, "initial API call recorded");

            ledger
                .upsert(RecordUpdate {
                    file_key: file_key.to_string(),
                    status,
                    result: payload.clone(),
                    time_taken: None,
                    status_code,
                    resume_handle: resume_handle.clone(),
                })
                .await?;
        }
    }

    // Poll until the remote source reports a terminal status. No iteration
    // cap; the client's own timeout bounds each call.
    while !status.is_terminal() {
        tokio::time::sleep(config.poll_interval).await;

        let handle = resume_handle.as_deref().ok_or_else(|| {
            DocbatchError::Api(
                "remote reported a non-terminal status without a status endpoint".to_string(),
            )
        })?;

        let update = client.check_status(handle).await?;
        status = update.status;
        status_code = update.status_code;
        payload = Some(update.body);

        // Intermediate polls record progress but leave the result column
        // null; only the terminal row carries the full payload.
        ledger
            .upsert(RecordUpdate {
                file_key: file_key.to_string(),
                status,
                result: None,
                time_taken: None,
                status_code,
                resume_handle: resume_handle.clone(),
            })
            .await?;
    }

    Ok(Terminal {
        status,
        payload,
        status_code,
        resume_handle,
    })
}
