//! ledgerdash-import: bulk invoice import
//!
//! Validates a JSON file of `{customerName, amount, status}` records against
//! the customers known to the server, then submits the whole batch to the
//! invoice write endpoint.
//!
//! Usage:
//!   ledgerdash-import invoices.json
//!   ledgerdash-import invoices.json --dry-run
//!   ledgerdash-import invoices.json --config ledgerdash.yaml

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use ledgerdash::config::Config;
use ledgerdash::import::{self, InvoiceSubmitter, NO_INVOICES, SUBMIT_SUCCESS};
use ledgerdash::utils::bootstrap::init_tracing;

#[derive(Parser)]
#[command(name = "ledgerdash-import")]
#[command(about = "Validate and submit a JSON file of invoices")]
#[command(version)]
struct Cli {
    /// JSON file holding an array of invoices
    file: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Validate and print the invoices without submitting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

/// Returns the message shown to the operator on failure.
async fn run(cli: Cli) -> Result<(), String> {
    let config = Config::load(cli.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        format!("Failed to load configuration: {}", e)
    })?;

    let bytes = tokio::fs::read(&cli.file)
        .await
        .map_err(|e| format!("Failed to read {}: {}", cli.file.display(), e))?;

    let submitter =
        InvoiceSubmitter::new(&config.import).map_err(|e| e.user_message().to_string())?;
    let customers = submitter
        .known_customers()
        .await
        .map_err(|e| e.user_message().to_string())?;

    let invoices = import::validate(&bytes, &customers).map_err(|e| {
        error!(error = %e, "Invoice file rejected");
        e.to_string()
    })?;

    if invoices.is_empty() {
        println!("{}", NO_INVOICES);
        return Ok(());
    }

    for invoice in &invoices {
        println!(
            "{}  customer={}  amount={:.2}  status={}",
            invoice.id, invoice.customer_id, invoice.amount, invoice.status
        );
    }

    if cli.dry_run {
        println!("{} invoices valid (dry run, nothing submitted)", invoices.len());
        return Ok(());
    }

    submitter
        .submit(&invoices)
        .await
        .map_err(|e| e.user_message().to_string())?;

    println!("{}", SUBMIT_SUCCESS);
    Ok(())
}
