//! Run configuration.
//!
//! The CLI args are parsed once and converted into an immutable [`BatchConfig`]
//! that is passed into the dispatcher and threaded through every driver
//! invocation. No process-wide mutable state.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Flags controlling which files a run picks up again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipFlags {
    /// Process files whose last attempt ended in ERROR.
    pub retry_failed: bool,
    /// Discard any stored status endpoint and resubmit pending files fresh.
    pub retry_pending: bool,
    /// Skip pending files entirely. Takes precedence over `retry_pending`.
    pub skip_pending: bool,
    /// Skip files that have never been attempted.
    pub skip_unprocessed: bool,
}

/// Immutable configuration for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// API endpoint files are submitted to. Opaque to the core; consumed by the client.
    pub api_endpoint: String,
    /// API key for authenticating calls. Opaque to the core.
    pub api_key: String,
    /// Per-call timeout for submit and status-check requests.
    pub api_timeout: Duration,
    /// Sleep between status polls while a file is pending remotely.
    pub poll_interval: Duration,
    /// Worker pool width: number of files processed in parallel.
    pub parallel_call_count: usize,
    /// Skip/retry policy flags.
    pub flags: SkipFlags,
}

/// Process a folder of files through a document-processing API, resumably.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// API endpoint to use for processing the files
    #[arg(short = 'e', long, env = "DOCBATCH_API_ENDPOINT")]
    pub api_endpoint: String,

    /// API key for authenticating the calls
    #[arg(short = 'k', long, env = "DOCBATCH_API_KEY")]
    pub api_key: String,

    /// Time in seconds to wait for each API call
    #[arg(short = 't', long, default_value_t = 10)]
    pub api_timeout: u64,

    /// Time in seconds to sleep between status polls
    #[arg(short = 'i', long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Path where the files to process are present
    #[arg(short = 'f', long)]
    pub input_folder_path: PathBuf,

    /// Recurse into subdirectories of the input folder
    #[arg(long)]
    pub recursive: bool,

    /// Number of files to process in parallel
    #[arg(short = 'p', long, default_value_t = 10)]
    pub parallel_call_count: usize,

    /// Retry processing of failed files
    #[arg(long)]
    pub retry_failed: bool,

    /// Resubmit pending files as new requests instead of polling their stored status endpoint
    #[arg(long)]
    pub retry_pending: bool,

    /// Skip processing of pending files (overrides --retry-pending)
    #[arg(long)]
    pub skip_pending: bool,

    /// Skip unprocessed files while retrying failed ones
    #[arg(long)]
    pub skip_unprocessed: bool,

    /// Minimum log level (tracing env-filter syntax)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Print a detailed report of all processed files at the end
    #[arg(long)]
    pub print_report: bool,

    /// Export all ledger records to a CSV file at the end
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Path of the ledger database file
    #[arg(long, default_value = "file_processing.db")]
    pub db_path: PathBuf,
}

impl Args {
    /// Build the immutable run configuration from the parsed arguments.
    pub fn to_config(&self) -> BatchConfig {
        BatchConfig {
            api_endpoint: self.api_endpoint.clone(),
            api_key: self.api_key.clone(),
            api_timeout: Duration::from_secs(self.api_timeout),
            poll_interval: Duration::from_secs(self.poll_interval),
            parallel_call_count: self.parallel_call_count,
            flags: SkipFlags {
                retry_failed: self.retry_failed,
                retry_pending: self.retry_pending,
                skip_pending: self.skip_pending,
                skip_unprocessed: self.skip_unprocessed,
            },
        }
    }
}
