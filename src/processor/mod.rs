//! Batch processing of notice directories.
//!
//! Ties together file discovery, concurrent extraction and JSON Lines output.
//! Extraction failures never abort a batch: each one is a per-document
//! outcome, counted in the statistics and logged.

pub mod discovery;
pub mod streaming;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{discovery::FileDiscovery, streaming::StreamingExtractor, writer::NoticeWriter};

use crate::config::ExtractionConfig;
use crate::error::{NoticeError, Result};
use crate::models::{ParseOutcome, ProcessingStats};

use colored::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of one document, labelled with where it came from
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub source: String,
    pub outcome: ParseOutcome,
}

/// Everything a batch run produced
#[derive(Debug)]
pub struct BatchReport {
    pub stats: ProcessingStats,
    /// Sorted by source
    pub documents: Vec<ProcessedDocument>,
}

/// Main processor for notice directories
#[derive(Debug)]
pub struct BatchProcessor {
    input_dir: PathBuf,
    output_path: Option<PathBuf>,
    config: ExtractionConfig,
    file_discovery: FileDiscovery,
}

impl BatchProcessor {
    /// Create a processor for `input_dir`; notices are written only when an
    /// output path is given
    pub fn new(input_dir: PathBuf, output_path: Option<PathBuf>) -> Result<Self> {
        if !input_dir.is_dir() {
            return Err(NoticeError::InputNotFound { path: input_dir });
        }

        let config = ExtractionConfig::default();
        Ok(Self {
            file_discovery: FileDiscovery::new(input_dir.clone(), config.file_extensions.clone()),
            input_dir,
            output_path,
            config,
        })
    }

    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.file_discovery =
            FileDiscovery::new(self.input_dir.clone(), config.file_extensions.clone());
        self.config = config;
        self
    }

    /// Main processing entry point
    pub async fn process(&mut self) -> Result<BatchReport> {
        let start_time = Instant::now();
        self.config.validate()?;

        println!("{}", "Starting notice extraction".bright_green().bold());
        println!("  {} {}", "Input:".bright_cyan(), self.input_dir.display());
        if let Some(output_path) = &self.output_path {
            println!("  {} {}", "Output:".bright_cyan(), output_path.display());
        }
        println!(
            "  {} {}",
            "Working language:".bright_cyan(),
            self.config.working_language
        );

        println!("\n{}", "Discovering notice files...".bright_yellow());
        let files = self.file_discovery.discover_notice_files()?;
        println!(
            "  {} {} notice files",
            "Found".bright_green(),
            files.len().to_string().bright_white().bold()
        );
        if files.is_empty() {
            warn!("No notice files found in {}", self.input_dir.display());
        }

        println!("\n{}", "Extracting notices...".bright_yellow());
        let extractor = StreamingExtractor::new(self.config.clone());
        let (mut documents, mut stats) = extractor.extract_files(&files).await;
        documents.sort_by(|a, b| a.source.cmp(&b.source));

        for document in &documents {
            if let ParseOutcome::Failure(err) = &document.outcome {
                warn!("{}: {}", document.source, err);
            }
        }

        if let Some(output_path) = &self.output_path {
            let writer = NoticeWriter::new(output_path.clone());
            let written = writer.write(&documents)?;
            info!("{} notices written to {}", written, writer.output_path().display());
            stats.output_path = Some(output_path.clone());
        }

        stats.processing_time_ms = start_time.elapsed().as_millis();
        print_summary(&stats);

        Ok(BatchReport { stats, documents })
    }
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Extraction complete".bright_green().bold());
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    if stats.files_unreadable > 0 {
        println!(
            "  {} {}",
            "Files unreadable:".bright_cyan(),
            stats.files_unreadable.to_string().bright_red()
        );
    }
    println!(
        "  {} {}",
        "Award notices:".bright_cyan(),
        stats.documents.to_string().bright_white()
    );
    for (format, count) in &stats.documents_by_format {
        println!("    {} {}", format.cyan(), count);
    }
    println!(
        "  {} {}",
        "Not award notices:".bright_cyan(),
        stats.not_award_notices.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Other languages:".bright_cyan(),
        stats.language_excluded.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Failures:".bright_cyan(),
        if stats.failures > 0 {
            stats.failures.to_string().bright_red()
        } else {
            stats.failures.to_string().bright_white()
        }
    );
    for (kind, count) in &stats.failures_by_kind {
        println!("    {} {}", kind.red(), count);
    }
    if stats.dropped_entities > 0 {
        println!(
            "  {} {}",
            "Dropped entities:".bright_cyan(),
            stats.dropped_entities.to_string().bright_yellow()
        );
    }
    if let Some(output_path) = &stats.output_path {
        println!("  {} {}", "Output:".bright_cyan(), output_path.display());
    }
    println!(
        "  {} {:.2}s",
        "Time:".bright_cyan(),
        stats.processing_time_ms as f64 / 1000.0
    );
}
