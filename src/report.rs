//! Human-facing reporting and export over a read-only ledger snapshot.

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::ledger::Ledger;

/// Print status counts, mirroring the run's final summary.
pub async fn print_summary<L: Ledger>(ledger: &L) -> Result<()> {
    let summary = ledger.summary().await?;

    println!("\nFinal Summary:");
    for (status, count) in summary {
        println!("Status '{status}': {count}");
    }
    Ok(())
}

/// Print a per-file table: file, status, elapsed seconds.
pub async fn print_report<L: Ledger>(ledger: &L) -> Result<()> {
    let records = ledger.all_records().await?;

    println!("\nDetailed Report:");
    if records.is_empty() {
        println!("No records found in the ledger.");
        return Ok(());
    }

    let file_width = records
        .iter()
        .map(|r| r.file_key.len())
        .chain(std::iter::once("File Name".len()))
        .max()
        .unwrap_or(0);

    println!(
        "{:<file_width$}  {:<10}  {}",
        "File Name", "Status", "Time Elapsed (seconds)"
    );
    for record in records {
        let elapsed = record
            .time_taken
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<file_width$}  {:<10}  {}",
            record.file_key,
            record.status.as_str(),
            elapsed
        );
    }
    Ok(())
}

/// Export every ledger record to a CSV file.
pub async fn export_csv<L: Ledger>(ledger: &L, path: &Path) -> Result<()> {
    let records = ledger.all_records().await?;

    let mut out = std::fs::File::create(path)?;
    writeln!(
        out,
        "file_key,status,status_code,time_taken,embedding_cost,embedding_tokens,\
         llm_cost,llm_tokens,error_message,created_at,updated_at"
    )?;

    for record in &records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&record.file_key),
            record.status,
            opt(record.status_code),
            opt(record.time_taken),
            opt(record.embedding_cost),
            opt(record.embedding_tokens),
            opt(record.llm_cost),
            opt(record.llm_tokens),
            csv_field(record.error_message.as_deref().unwrap_or("")),
            record.created_at.to_rfc3339(),
            record.updated_at.to_rfc3339(),
        )?;
    }

    tracing::info!(path = %path.display(), rows = records.len(), "exported ledger to CSV");
    Ok(())
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::in_memory::InMemoryLedger;
    use crate::ledger::{ExecutionStatus, RecordUpdate};

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain.pdf"), "plain.pdf");
        assert_eq!(csv_field("a,b.pdf"), "\"a,b.pdf\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[tokio::test]
    async fn test_export_csv_writes_all_rows() {
        let ledger = InMemoryLedger::new();
        for (key, status) in [
            ("a.pdf", ExecutionStatus::Completed),
            ("b,with comma.pdf", ExecutionStatus::Error),
        ] {
            ledger
                .upsert(RecordUpdate {
                    file_key: key.to_string(),
                    status,
                    result: None,
                    time_taken: Some(1.25),
                    status_code: Some(200),
                    resume_handle: None,
                })
                .await
                .unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        export_csv(&ledger, &path).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("file_key,status"));
        assert!(lines[1].starts_with("a.pdf,COMPLETED"));
        assert!(lines[2].starts_with("\"b,with comma.pdf\",ERROR"));
    }
}
