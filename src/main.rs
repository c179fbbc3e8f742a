use anyhow::{Context, Result};
use clap::Parser;
use notice_processor::BatchProcessor;
use notice_processor::cli::{Args, setup_logging};
use std::process;
use tracing::info;

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = run(args) => result,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for CTRL+C")?;
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(anyhow::anyhow!("Processing interrupted by user"))
            }
        }
    });

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.to_config();
    config.validate().context("Invalid configuration")?;

    let mut processor = BatchProcessor::new(args.input_dir.clone(), args.output.clone())
        .with_context(|| format!("Cannot process {}", args.input_dir.display()))?
        .with_config(config);

    let report = processor
        .process()
        .await
        .context("Batch processing failed")?;

    info!(
        "{} award notices from {} files ({} failures)",
        report.stats.documents, report.stats.files_processed, report.stats.failures
    );
    Ok(())
}
