//! `guest-import`: upload a CSV or tab-separated guest list to the server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use domain::models::{CLIENT_IMPORT_TIMEOUT_SECS, IMPORT_BATCH_SIZE};
use domain::services::{chunk_count, parse_records, split_submittable};
use tracing::info;

use wedding_planner_api::client::{BatchUploader, UploadReport};
use wedding_planner_api::middleware::logging::init_cli_logging;

#[derive(Parser, Debug)]
#[command(
    name = "guest-import",
    version,
    about = "Import a guest list (CSV or tab-separated) into the wedding planner"
)]
struct Cli {
    /// Guest list file; the first line must be a header with Name and Household
    file: PathBuf,

    /// Base URL of the wedding planner API
    #[arg(long, env = "WED_SERVER_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Admin API key sent as X-API-Key
    #[arg(long, env = "WED_ADMIN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Records per request
    #[arg(long, default_value_t = IMPORT_BATCH_SIZE)]
    batch_size: usize,

    /// Deadline for the whole upload, in seconds
    #[arg(long, default_value_t = CLIENT_IMPORT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Parse and report without uploading
    #[arg(long)]
    dry_run: bool,

    /// Log each chunk
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logging(cli.verbose);

    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let parsed = parse_records(&text)
        .with_context(|| format!("Failed to parse {}", cli.file.display()))?;

    let (records, dropped) = split_submittable(parsed.records);
    if dropped > 0 {
        println!("Skipping {} rows without a name or household", dropped);
    }
    if records.is_empty() {
        bail!("No valid guest records found. Every row needs a Name and a Household.");
    }

    let batch_size = cli.batch_size.max(1);
    println!(
        "Parsed {} guests; {} requests of up to {} rows",
        records.len(),
        chunk_count(records.len(), batch_size),
        batch_size
    );

    if cli.dry_run {
        return Ok(());
    }

    let mut uploader = BatchUploader::new(&cli.server)
        .with_batch_size(batch_size)
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(key) = cli.api_key {
        uploader = uploader.with_api_key(key);
    }

    let report = uploader
        .upload(&records, |percent| info!(percent, "Upload progress"))
        .await?;

    print_report(&report, dropped);
    Ok(())
}

fn print_report(report: &UploadReport, dropped_locally: u32) {
    let totals = &report.totals;
    println!(
        "Imported {} guests into {} new households in {} requests ({:.1}s)",
        totals.processed.guests,
        totals.processed.households,
        report.chunks,
        report.elapsed.as_secs_f64()
    );
    println!("Duplicates skipped: {}", totals.skipped.duplicates);

    let invalid = totals.skipped.invalid_rows + dropped_locally;
    if invalid > 0 {
        println!("Invalid rows skipped: {}", invalid);
    }

    let failed = totals.failed_rows();
    if !failed.is_empty() {
        println!("Failed rows:");
        for row in failed {
            println!(
                "  {} ({}): {}",
                row.name,
                row.household_name,
                row.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    for error in &totals.errors {
        println!("Error: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["guest-import", "guests.csv"]);
        assert_eq!(cli.file, PathBuf::from("guests.csv"));
        assert_eq!(cli.batch_size, 10);
        assert_eq!(cli.timeout_secs, 60);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "guest-import",
            "--server",
            "https://wedding.example",
            "--batch-size",
            "25",
            "--dry-run",
            "list.tsv",
        ]);
        assert_eq!(cli.server, "https://wedding.example");
        assert_eq!(cli.batch_size, 25);
        assert!(cli.dry_run);
    }
}
