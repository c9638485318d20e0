use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docbatch::{dispatcher, report, Args, ReqwestApiClient, SqliteLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::warn!(?args, "running with params");

    let config = Arc::new(args.to_config());
    let ledger = Arc::new(SqliteLedger::open(&args.db_path).await?);
    let client = Arc::new(ReqwestApiClient::new(
        &config.api_endpoint,
        &config.api_key,
        config.api_timeout,
    )?);

    let files = dispatcher::list_files(&args.input_folder_path, args.recursive)?;
    if files.is_empty() {
        tracing::warn!(folder = %args.input_folder_path.display(), "no input files found");
    }

    let totals = dispatcher::run_batch(files, config, client, ledger.clone()).await;
    tracing::info!(
        succeeded = totals.succeeded,
        failed = totals.failed,
        skipped = totals.skipped,
        "batch finished"
    );

    report::print_summary(ledger.as_ref()).await?;

    if args.print_report {
        report::print_report(ledger.as_ref()).await?;
        tracing::warn!(
            "elapsed time of a file resumed from a pending state covers only this run's polling"
        );
    }

    if let Some(path) = &args.export_csv {
        report::export_csv(ledger.as_ref(), path).await?;
    }

    Ok(())
}
