//! Concurrent extraction of notice files
//!
//! Each file is read asynchronously and extracted on the blocking pool, one
//! document per task. Tasks share nothing but the configuration; statistics
//! are folded together once every task has finished.

use super::ProcessedDocument;
use crate::config::ExtractionConfig;
use crate::dispatcher::{decode, extract};
use crate::error::{NoticeError, Result};
use crate::models::{NoticeFormat, NoticeInput, ProcessingStats};
use crate::parsers::legacy::split_blocks;
use crate::sniffer::sniff;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{debug, warn};

/// Streaming extractor for batches of notice files
#[derive(Debug)]
pub struct StreamingExtractor {
    config: ExtractionConfig,
    semaphore: Arc<Semaphore>,
}

impl StreamingExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        let permits = config.max_concurrent_files.max(1);
        Self {
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Extract every file; output order is unspecified
    pub async fn extract_files(
        &self,
        files: &[PathBuf],
    ) -> (Vec<ProcessedDocument>, ProcessingStats) {
        let pb = self.progress_bar(files.len());
        let concurrent_limit = self.config.max_concurrent_files.min(files.len()).max(1);

        let results = stream::iter(files)
            .map(|file_path| {
                let sem = self.semaphore.clone();
                let config = self.config.clone();
                let pb = pb.clone();
                async move {
                    let result = match sem.acquire().await {
                        Ok(_permit) => extract_path(file_path, config).await,
                        Err(e) => Err(NoticeError::ProcessingFailed {
                            path: file_path.clone(),
                            reason: format!("Failed to acquire extraction permit: {}", e),
                        }),
                    };
                    pb.inc(1);
                    (file_path, result)
                }
            })
            .buffer_unordered(concurrent_limit)
            .collect::<Vec<_>>()
            .await;

        pb.finish_with_message("All notice files processed");

        let mut stats = ProcessingStats::default();
        let mut documents = Vec::new();
        for (file_path, result) in results {
            match result {
                Ok(extracted) => {
                    stats.files_processed += 1;
                    for document in &extracted {
                        stats.record(&document.outcome);
                    }
                    documents.extend(extracted);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file_path.display(), e);
                    stats.files_unreadable += 1;
                }
            }
        }

        (documents, stats)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Extracting notices");
        pb
    }
}

/// Read one file and extract it on the blocking pool
async fn extract_path(file_path: &Path, config: ExtractionConfig) -> Result<Vec<ProcessedDocument>> {
    let bytes = fs::read(file_path).await?;
    let input = NoticeInput::new(bytes, file_path.to_string_lossy());

    task::spawn_blocking(move || extract_file(input, &config))
        .await
        .map_err(|e| NoticeError::ProcessingFailed {
            path: file_path.to_path_buf(),
            reason: format!("Extraction task failed: {}", e),
        })
}

/// Extract one file. A legacy archive holding several notice blocks yields one
/// document per block, each labelled `file#n`.
pub fn extract_file(input: NoticeInput, config: &ExtractionConfig) -> Vec<ProcessedDocument> {
    let is_legacy = matches!(
        sniff(&input.bytes, &input.filename, config.sniff_prefix_bytes),
        Ok(NoticeFormat::LegacyFieldCoded)
    );

    if is_legacy {
        if let Ok(text) = decode(&input, NoticeFormat::LegacyFieldCoded) {
            let blocks = split_blocks(&text);
            if blocks.len() > 1 {
                debug!("{}: {} legacy notice blocks", input.filename, blocks.len());
                return blocks
                    .into_iter()
                    .enumerate()
                    .map(|(i, block)| {
                        let source = format!("{}#{}", input.filename, i + 1);
                        let mut block_input = NoticeInput::new(block, source.clone());
                        block_input.declared_format = input.declared_format;
                        ProcessedDocument {
                            outcome: extract(&block_input, config),
                            source,
                        }
                    })
                    .collect();
            }
        }
    }

    vec![ProcessedDocument {
        outcome: extract(&input, config),
        source: input.filename,
    }]
}
