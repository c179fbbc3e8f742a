//! Integration tests for the processor module
//!
//! Tests the complete batch pipeline against temporary notice directories
//! built from the shared fixtures.

pub mod error_handling;

use std::fs;
use std::path::Path;

pub const LEGACY: &str = include_str!("../../../tests/fixtures/legacy_award.txt");
pub const EARLY: &str = include_str!("../../../tests/fixtures/early_award.en");
pub const UNIFIED_R207: &str = include_str!("../../../tests/fixtures/unified_r207_award.xml");
pub const UNIFIED_R209: &str = include_str!("../../../tests/fixtures/unified_r209_award.xml");
pub const UBL: &str = include_str!("../../../tests/fixtures/ubl_award.xml");

/// Write a notice file, creating parent directories
pub fn write_notice(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
