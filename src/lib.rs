#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod models;
pub mod utils;

// Re-export commonly used types outside of crate (for the bins)
pub use config::{AnalysisConfig, PERSISTENCE, StorePaths};
pub use data::{CsvStore, HyperliquidProvider, SnapshotCollector, SqliteStore};
pub use domain::{FundingObservation, SnapshotRow};

// CLI argument parsing
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Hyperliquid funding-rate snapshot collector", long_about = None)]
pub struct Cli {
    /// Collect a single snapshot and exit (status 1 on failure)
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Directory holding the data files
    #[arg(long, default_value = PERSISTENCE.files.directory)]
    pub data_dir: std::path::PathBuf,

    /// Hours between polls
    #[arg(long)]
    pub interval_hours: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_scheduler_in_data_dir() {
        let cli = Cli::parse_from(["funding-collector"]);
        assert!(!cli.once);
        assert_eq!(cli.data_dir, std::path::PathBuf::from("data"));
        assert_eq!(cli.interval_hours, None);

        let cli = Cli::parse_from(["funding-collector", "--once", "--data-dir", "/tmp/x"]);
        assert!(cli.once);
        assert_eq!(cli.data_dir, std::path::PathBuf::from("/tmp/x"));
    }
}
