//! Configuration for extraction and batch processing.
//!
//! Extraction itself needs very little: the working language for per-language
//! formats and the size of the prefix the sniffer may inspect. The remaining
//! settings drive the batch processor.

use crate::constants::{
    DEFAULT_FILE_EXTENSIONS, DEFAULT_SNIFF_PREFIX_BYTES, DEFAULT_WORKING_LANGUAGE,
    MIN_SNIFF_PREFIX_BYTES,
};
use crate::error::{NoticeError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extraction and processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Language of per-language files that are processed, others are excluded
    pub working_language: String,

    /// Bytes of content the sniffer may inspect
    pub sniff_prefix_bytes: usize,

    /// Maximum number of files parsed concurrently
    pub max_concurrent_files: usize,

    /// Show a progress bar during batch processing
    pub show_progress: bool,

    /// File extensions picked up by directory discovery
    pub file_extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            working_language: DEFAULT_WORKING_LANGUAGE.to_string(),
            sniff_prefix_bytes: DEFAULT_SNIFF_PREFIX_BYTES,
            max_concurrent_files: num_cpus::get(),
            show_progress: true,
            file_extensions: DEFAULT_FILE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_language(mut self, language: impl Into<String>) -> Self {
        self.working_language = language.into().trim().to_uppercase();
        self
    }

    pub fn with_sniff_prefix_bytes(mut self, bytes: usize) -> Self {
        self.sniff_prefix_bytes = bytes;
        self
    }

    pub fn with_max_concurrent_files(mut self, max: usize) -> Self {
        self.max_concurrent_files = max;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_file_extensions(mut self, extensions: Vec<String>) -> Self {
        self.file_extensions = extensions;
        self
    }

    /// Whether a per-language file in `language` belongs to the working set
    pub fn is_working_language(&self, language: &str) -> bool {
        language.trim().eq_ignore_ascii_case(&self.working_language)
    }

    pub fn validate(&self) -> Result<()> {
        if self.working_language.len() != 2
            || !self.working_language.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(NoticeError::Configuration {
                message: format!(
                    "working_language must be a two-letter code, got '{}'",
                    self.working_language
                ),
            });
        }

        if self.sniff_prefix_bytes < MIN_SNIFF_PREFIX_BYTES {
            return Err(NoticeError::Configuration {
                message: format!(
                    "sniff_prefix_bytes must be at least {}, got {}",
                    MIN_SNIFF_PREFIX_BYTES, self.sniff_prefix_bytes
                ),
            });
        }

        if self.max_concurrent_files == 0 {
            return Err(NoticeError::Configuration {
                message: "max_concurrent_files must be greater than 0".to_string(),
            });
        }

        debug!(
            "Configuration validated: language={}, prefix={} bytes, workers={}",
            self.working_language, self.sniff_prefix_bytes, self.max_concurrent_files
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractionConfig::default();
        assert_eq!(config.working_language, "EN");
        assert_eq!(config.sniff_prefix_bytes, DEFAULT_SNIFF_PREFIX_BYTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_normalises_language() {
        let config = ExtractionConfig::new().with_working_language(" de ");
        assert_eq!(config.working_language, "DE");
        assert!(config.is_working_language("de"));
        assert!(!config.is_working_language("EN"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = ExtractionConfig::new().with_working_language("english");
        assert!(matches!(
            config.validate(),
            Err(NoticeError::Configuration { .. })
        ));

        let config = ExtractionConfig::new().with_sniff_prefix_bytes(16);
        assert!(config.validate().is_err());

        let config = ExtractionConfig::new().with_max_concurrent_files(0);
        assert!(config.validate().is_err());
    }
}
