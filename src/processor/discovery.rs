//! File discovery for notice directories
//!
//! Walks the input directory recursively and picks up every file whose
//! extension is configured, plus per-language renditions named with a
//! two-letter language suffix (`114495-2008.en`).

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File discovery component for notice directories
#[derive(Debug)]
pub struct FileDiscovery {
    input_dir: PathBuf,
    extensions: Vec<String>,
}

impl FileDiscovery {
    /// Create a new file discovery instance
    pub fn new(input_dir: PathBuf, extensions: Vec<String>) -> Self {
        Self {
            input_dir,
            extensions,
        }
    }

    /// Discover all notice files below the input directory, sorted by path
    pub fn discover_notice_files(&self) -> Result<Vec<PathBuf>> {
        debug!("Searching for notice files in: {}", self.input_dir.display());

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.input_dir).follow_links(true) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() && is_notice_file(entry.path(), &self.extensions) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        debug!("Found {} notice files", files.len());
        Ok(files)
    }
}

/// Check if a path looks like a notice file
pub fn is_notice_file(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|known| known.eq_ignore_ascii_case(ext))
        || (ext.len() == 2 && ext.chars().all(|c| c.is_ascii_alphabetic()))
}
