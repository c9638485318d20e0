//! Concurrent dispatcher: fans a batch of files out over a bounded worker
//! pool and aggregates per-file outcomes into run totals.
//!
//! Counters are folded in at the single join point rather than mutated from
//! the workers, so their integrity does not depend on shared-memory ordering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::ApiClient;
use crate::config::BatchConfig;
use crate::driver::{process_file, FileOutcome};
use crate::error::{DocbatchError, Result};
use crate::ledger::Ledger;

/// Final counters for one run. Succeeded + failed + skipped equals the number
/// of input files, whatever the completion interleaving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl RunTotals {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Succeeded => self.succeeded += 1,
            FileOutcome::Failed => self.failed += 1,
            FileOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }
}

/// Enumerate the regular files under `folder`, optionally recursing. Sorted
/// for a deterministic submission order; completion order stays arbitrary.
pub fn list_files(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(folder, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_file() {
            out.push(entry.path());
        } else if file_type.is_dir() && recursive {
            collect_files(&entry.path(), recursive, out)?;
        }
    }
    Ok(())
}

/// Run the lifecycle driver for every file under a pool of
/// `parallel_call_count` workers and report live progress.
///
/// The run itself always completes: a driver that escapes with a ledger error
/// is logged and counted as failed, it never aborts the batch.
pub async fn run_batch<C, L>(
    files: Vec<PathBuf>,
    config: Arc<BatchConfig>,
    client: Arc<C>,
    ledger: Arc<L>,
) -> RunTotals
where
    C: ApiClient + 'static,
    L: Ledger + 'static,
{
    let total = files.len();
    let semaphore = Arc::new(Semaphore::new(config.parallel_call_count.max(1)));
    let mut join_set: JoinSet<(PathBuf, Result<FileOutcome>)> = JoinSet::new();

    tracing::info!(total, workers = config.parallel_call_count, "starting batch");

    for file in files {
        let semaphore = semaphore.clone();
        let config = config.clone();
        let client = client.clone();
        let ledger = ledger.clone();

        join_set.spawn(async move {
            let permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| DocbatchError::Internal("worker pool semaphore closed".to_string()));
            let outcome = match permit {
                Ok(_permit) => process_file(&file, &config, client.as_ref(), ledger.as_ref()).await,
                Err(e) => Err(e),
            };
            (file, outcome)
        });
    }

    let mut totals = RunTotals::default();
    let mut done = 0usize;

    while let Some(joined) = join_set.join_next().await {
        done += 1;
        match joined {
            Ok((_, Ok(outcome))) => totals.record(outcome),
            Ok((file, Err(e))) => {
                // Ledger failures abort only that file's attempt.
                tracing::error!(file = %file.display(), error = %e, "file attempt aborted");
                totals.failed += 1;
            }
            Err(join_error) => {
                tracing::error!(error = %join_error, "worker task panicked");
                totals.failed += 1;
            }
        }
        tracing::info!(
            succeeded = totals.succeeded,
            failed = totals.failed,
            skipped = totals.skipped,
            done,
            total,
            "progress"
        );
    }

    totals
}
