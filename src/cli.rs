//! Command-line interface components.

use crate::config::ExtractionConfig;
use crate::constants::{DEFAULT_WORKING_LANGUAGE, LOG_TARGET};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "notice-processor")]
#[command(about = "Extract normalized records from procurement contract award notices")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Directory containing notice files (searched recursively)
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Write extracted notices to this file as JSON lines
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Language of per-language renditions to process; others are skipped
    #[arg(short = 'l', long, default_value = DEFAULT_WORKING_LANGUAGE)]
    pub working_language: String,

    /// Number of files parsed concurrently (defaults to the number of CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Build the extraction configuration from the arguments
    pub fn to_config(&self) -> ExtractionConfig {
        let mut config = ExtractionConfig::default()
            .with_working_language(&self.working_language)
            .with_progress(!self.no_progress);
        if let Some(workers) = self.workers {
            config = config.with_max_concurrent_files(workers);
        }
        config
    }
}

/// Set up structured logging to stderr; `RUST_LOG` takes precedence
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", LOG_TARGET, log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["notice-processor", "/data/notices"]).unwrap();
        assert_eq!(args.input_dir, PathBuf::from("/data/notices"));
        assert_eq!(args.output, None);
        assert_eq!(args.get_log_level(), "info");

        let config = args.to_config();
        assert_eq!(config.working_language, "EN");
        assert!(config.show_progress);
        assert_eq!(config.max_concurrent_files, num_cpus::get());
    }

    #[test]
    fn test_options_reach_the_config() {
        let args = Args::try_parse_from([
            "notice-processor",
            "/data/notices",
            "--output",
            "notices.jsonl",
            "--working-language",
            "fr",
            "--workers",
            "3",
            "--no-progress",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.output, Some(PathBuf::from("notices.jsonl")));
        assert_eq!(args.get_log_level(), "debug");

        let config = args.to_config();
        assert_eq!(config.working_language, "FR");
        assert_eq!(config.max_concurrent_files, 3);
        assert!(!config.show_progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_input_dir_is_required() {
        assert!(Args::try_parse_from(["notice-processor"]).is_err());
    }
}
