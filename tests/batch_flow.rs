//! End-to-end batch scenarios against the mock API client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use docbatch::{
    run_batch, BatchConfig, ExecutionStatus, InMemoryLedger, Ledger, MockApiClient, RecordUpdate,
    SkipFlags, SqliteLedger, StatusResponse, SubmitOutcome,
};

fn config(flags: SkipFlags, workers: usize) -> Arc<BatchConfig> {
    Arc::new(BatchConfig {
        api_endpoint: "https://api.example.com/deployment".to_string(),
        api_key: "test-key".to_string(),
        api_timeout: Duration::from_secs(1),
        poll_interval: Duration::from_millis(5),
        parallel_call_count: workers,
        flags,
    })
}

fn pending_submit(handle: &str) -> SubmitOutcome {
    SubmitOutcome::Pending {
        resume_handle: handle.to_string(),
        status_code: Some(202),
        response: json!({ "execution_status": "PENDING" }),
    }
}

fn status(execution_status: &str) -> StatusResponse {
    StatusResponse {
        status: ExecutionStatus::from_remote(execution_status),
        status_code: Some(200),
        body: json!({ "execution_status": execution_status, "extraction_result": [] }),
    }
}

fn resolved_completed() -> SubmitOutcome {
    SubmitOutcome::Resolved {
        status: ExecutionStatus::Completed,
        status_code: Some(200),
        response: json!({ "execution_status": "COMPLETED", "extraction_result": [] }),
    }
}

async fn seed<L: Ledger>(ledger: &L, file_key: &str, status: ExecutionStatus) {
    ledger
        .upsert(RecordUpdate {
            file_key: file_key.to_string(),
            status,
            result: None,
            time_taken: Some(1.0),
            status_code: Some(200),
            resume_handle: None,
        })
        .await
        .unwrap();
}

/// Batch of three: a fresh file that polls to completion, a completed file
/// that is skipped, and a failed file retried under --retry-failed.
async fn run_three_file_scenario<L: Ledger + 'static>(ledger: Arc<L>) {
    seed(ledger.as_ref(), "b.pdf", ExecutionStatus::Completed).await;
    seed(ledger.as_ref(), "c.pdf", ExecutionStatus::Error).await;

    let client = Arc::new(MockApiClient::new());
    let handle = "https://api.example.com/status/a";
    client.add_submit_response("a.pdf", Ok(pending_submit(handle)));
    client.add_status_response(handle, Ok(status("EXECUTING")));
    client.add_status_response(handle, Ok(status("COMPLETED")));
    client.add_submit_response("c.pdf", Ok(resolved_completed()));

    let files = vec![
        PathBuf::from("a.pdf"),
        PathBuf::from("b.pdf"),
        PathBuf::from("c.pdf"),
    ];
    let flags = SkipFlags {
        retry_failed: true,
        ..SkipFlags::default()
    };

    let totals = run_batch(files, config(flags, 3), client.clone(), ledger.clone()).await;

    assert_eq!(totals.succeeded, 2);
    assert_eq!(totals.failed, 0);
    assert_eq!(totals.skipped, 1);

    // The completed file must never be resubmitted.
    let submits = client.submit_calls();
    assert!(!submits.contains(&PathBuf::from("b.pdf")));
    assert_eq!(submits.len(), 2);

    let summary = ledger.summary().await.unwrap();
    assert_eq!(summary.get(&ExecutionStatus::Completed), Some(&3));
    assert_eq!(summary.get(&ExecutionStatus::Error), None);
}

#[tokio::test]
async fn test_three_file_scenario_in_memory() {
    run_three_file_scenario(Arc::new(InMemoryLedger::new())).await;
}

#[sqlx::test]
async fn test_three_file_scenario_sqlite(pool: sqlx::SqlitePool) {
    let ledger = SqliteLedger::from_pool(pool);
    ledger.init_schema().await.unwrap();
    run_three_file_scenario(Arc::new(ledger)).await;
}

/// A pending file left over from a previous run resumes via its stored
/// handle: status checks only, no second submission.
#[tokio::test]
async fn test_resume_across_runs_without_resubmission() {
    let ledger = Arc::new(InMemoryLedger::new());
    let handle = "https://api.example.com/status/left-over";
    ledger
        .upsert(RecordUpdate {
            file_key: "a.pdf".to_string(),
            status: ExecutionStatus::Pending,
            result: None,
            time_taken: None,
            status_code: Some(202),
            resume_handle: Some(handle.to_string()),
        })
        .await
        .unwrap();

    let client = Arc::new(MockApiClient::new());
    client.add_status_response(handle, Ok(status("COMPLETED")));

    let totals = run_batch(
        vec![PathBuf::from("a.pdf")],
        config(SkipFlags::default(), 1),
        client.clone(),
        ledger.clone(),
    )
    .await;

    assert_eq!(totals.succeeded, 1);
    assert_eq!(client.submit_call_count(), 0);
    assert_eq!(client.status_call_count(), 1);

    let record = ledger.get("a.pdf").await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Completed);
}

/// One failing file does not disturb the counters of the others.
#[tokio::test]
async fn test_exception_containment_across_files() {
    let ledger = Arc::new(InMemoryLedger::new());
    let client = Arc::new(MockApiClient::new());

    client.add_submit_response("good.pdf", Ok(resolved_completed()));
    // "bad.pdf" has no configured response; the mock submit raises.

    let totals = run_batch(
        vec![PathBuf::from("good.pdf"), PathBuf::from("bad.pdf")],
        config(SkipFlags::default(), 2),
        client.clone(),
        ledger.clone(),
    )
    .await;

    assert_eq!(totals.succeeded, 1);
    assert_eq!(totals.failed, 1);
    assert_eq!(totals.skipped, 0);

    let bad = ledger.get("bad.pdf").await.unwrap().unwrap();
    assert_eq!(bad.status, ExecutionStatus::Error);
    assert!(bad.error_message.is_some());

    let good = ledger.get("good.pdf").await.unwrap().unwrap();
    assert_eq!(good.status, ExecutionStatus::Completed);
    assert!(good.error_message.is_none());
}

/// skip_pending takes priority over retry_pending when both are set.
#[tokio::test]
async fn test_skip_pending_overrides_retry_pending() {
    let ledger = Arc::new(InMemoryLedger::new());
    let handle = "https://api.example.com/status/p";
    ledger
        .upsert(RecordUpdate {
            file_key: "a.pdf".to_string(),
            status: ExecutionStatus::Pending,
            result: None,
            time_taken: None,
            status_code: Some(202),
            resume_handle: Some(handle.to_string()),
        })
        .await
        .unwrap();

    let client = Arc::new(MockApiClient::new());
    let flags = SkipFlags {
        retry_pending: true,
        skip_pending: true,
        ..SkipFlags::default()
    };

    let totals = run_batch(
        vec![PathBuf::from("a.pdf")],
        config(flags, 1),
        client.clone(),
        ledger.clone(),
    )
    .await;

    assert_eq!(totals.skipped, 1);
    assert_eq!(client.submit_call_count(), 0);
    assert_eq!(client.status_call_count(), 0);
}
