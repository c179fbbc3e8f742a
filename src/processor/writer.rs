//! JSON Lines output for extracted notices
//!
//! One line per extracted award notice, tagged with the file (or legacy
//! block) it came from. Outcomes other than a document are only counted.

use super::ProcessedDocument;
use crate::error::Result;
use crate::models::{AwardNotice, Contractor, ParseOutcome};

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One output line: the notice plus the entity keys used for deduplication
#[derive(Debug, Serialize)]
struct NoticeRecord<'a> {
    source: &'a str,
    contracting_body_fingerprint: String,
    /// Same order as `notice.contractors`
    contractor_fingerprints: Vec<String>,
    notice: &'a AwardNotice,
}

impl<'a> NoticeRecord<'a> {
    fn new(source: &'a str, notice: &'a AwardNotice) -> Self {
        Self {
            source,
            contracting_body_fingerprint: notice.contracting_body.fingerprint(),
            contractor_fingerprints: notice.contractors.iter().map(Contractor::fingerprint).collect(),
            notice,
        }
    }
}

/// Writer for JSON Lines notice output
#[derive(Debug)]
pub struct NoticeWriter {
    output_path: PathBuf,
}

impl NoticeWriter {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write every extracted notice, returning the number of lines written
    pub fn write(&self, documents: &[ProcessedDocument]) -> Result<usize> {
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut out = BufWriter::new(File::create(&self.output_path)?);
        let mut written = 0;

        for document in documents {
            if let ParseOutcome::Document(notice) = &document.outcome {
                let record = NoticeRecord::new(&document.source, notice);
                serde_json::to_writer(&mut out, &record)?;
                out.write_all(b"\n")?;
                written += 1;
            }
        }
        out.flush()?;

        debug!("Wrote {} notices to {}", written, self.output_path.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::dispatcher::extract;
    use crate::error::ExtractionError;
    use crate::models::{NoticeFormat, NoticeInput};
    use serde_json::Value;
    use tempfile::TempDir;

    const UBL: &str = include_str!("../../tests/fixtures/ubl_award.xml");

    fn processed(source: &str, outcome: ParseOutcome) -> ProcessedDocument {
        ProcessedDocument {
            source: source.to_string(),
            outcome,
        }
    }

    #[test]
    fn test_only_documents_are_written() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("nested").join("notices.jsonl");

        let notice = extract(
            &NoticeInput::new(UBL, "ubl.xml"),
            &ExtractionConfig::default(),
        );
        let extracted = notice.notice().cloned().unwrap();
        let documents = vec![
            processed("ubl.xml", notice),
            processed(
                "garbage.txt",
                ParseOutcome::Failure(ExtractionError::FormatNotRecognized {
                    filename: "garbage.txt".to_string(),
                }),
            ),
            processed(
                "notice.de",
                ParseOutcome::LanguageExcluded {
                    format: NoticeFormat::EarlyStructuredXml,
                    language: "DE".to_string(),
                },
            ),
        ];

        let writer = NoticeWriter::new(output_path.clone());
        assert_eq!(writer.write(&documents).unwrap(), 1);

        let content = fs::read_to_string(&output_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["source"], "ubl.xml");
        assert_eq!(
            record["notice"]["contracting_body"]["name"],
            "City of Springfield"
        );

        let body_key = record["contracting_body_fingerprint"].as_str().unwrap();
        assert_eq!(body_key.len(), 16);
        assert!(body_key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(body_key, extracted.contracting_body.fingerprint());

        let contractor_keys: Vec<String> =
            serde_json::from_value(record["contractor_fingerprints"].clone()).unwrap();
        let expected: Vec<String> = extracted.contractors.iter().map(Contractor::fingerprint).collect();
        assert!(!expected.is_empty());
        assert_eq!(contractor_keys, expected);
    }

    #[test]
    fn test_empty_batch_creates_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("empty.jsonl");

        let writer = NoticeWriter::new(output_path.clone());
        assert_eq!(writer.write(&[]).unwrap(), 0);
        assert_eq!(fs::read_to_string(&output_path).unwrap(), "");
    }
}
