//! Error handling integration tests

use super::{UBL, UNIFIED_R207, write_notice};
use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, NoticeError};
use crate::models::ParseOutcome;
use crate::processor::BatchProcessor;
use tempfile::TempDir;

fn quiet_config() -> ExtractionConfig {
    ExtractionConfig::default().with_progress(false)
}

#[tokio::test]
async fn test_nonexistent_input_directory() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent_path = temp_dir.path().join("nonexistent");

    let result = BatchProcessor::new(nonexistent_path.clone(), None);

    match result.unwrap_err() {
        NoticeError::InputNotFound { path } => assert_eq!(path, nonexistent_path),
        other => panic!("Expected InputNotFound error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_input_must_be_a_directory() {
    let temp_dir = TempDir::new().unwrap();
    write_notice(temp_dir.path(), "notice.xml", UBL);

    let result = BatchProcessor::new(temp_dir.path().join("notice.xml"), None);
    assert!(matches!(result, Err(NoticeError::InputNotFound { .. })));
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_notice(temp_dir.path(), "notice.xml", UBL);

    let config = quiet_config().with_max_concurrent_files(0);
    let mut processor = BatchProcessor::new(temp_dir.path().to_path_buf(), None)
        .unwrap()
        .with_config(config);

    assert!(matches!(
        processor.process().await,
        Err(NoticeError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_failures_do_not_abort_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_notice(root, "good.xml", UNIFIED_R207);
    write_notice(root, "binary.xml", "\u{0}\u{1}\u{2} not a notice");
    write_notice(root, "truncated.xml", &UBL[..UBL.len() / 2]);
    write_notice(root, "notes.txt", "free text\nwith no field codes\n");

    let mut processor = BatchProcessor::new(root.to_path_buf(), None)
        .unwrap()
        .with_config(quiet_config());
    let report = processor.process().await.unwrap();

    assert_eq!(report.stats.files_processed, 4);
    assert_eq!(report.stats.documents, 1);
    assert_eq!(report.stats.failures, 3);

    let good = report
        .documents
        .iter()
        .find(|d| d.source.ends_with("good.xml"))
        .unwrap();
    assert!(matches!(good.outcome, ParseOutcome::Document(_)));

    let binary = report
        .documents
        .iter()
        .find(|d| d.source.ends_with("binary.xml"))
        .unwrap();
    assert!(matches!(
        binary.outcome,
        ParseOutcome::Failure(ExtractionError::FormatNotRecognized { .. })
    ));
}

#[tokio::test]
async fn test_invalid_utf8_is_a_failure_not_a_repair() {
    let temp_dir = TempDir::new().unwrap();
    let mut bytes = UNIFIED_R207.as_bytes().to_vec();
    bytes.extend_from_slice(b"<!-- \xFF -->\n");
    std::fs::write(temp_dir.path().join("broken.xml"), bytes).unwrap();

    let mut processor = BatchProcessor::new(temp_dir.path().to_path_buf(), None)
        .unwrap()
        .with_config(quiet_config());
    let report = processor.process().await.unwrap();

    assert_eq!(report.stats.failures_by_kind.get("structural_corruption"), Some(&1));
    assert_eq!(report.stats.documents, 0);
}
