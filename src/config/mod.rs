//! Configuration module for the funding tracker.
//!
//! `const` blueprints hold the shipped defaults. The runtime structs take their
//! `Default` from them and are passed explicitly into each component.

mod analysis;
mod collection;
mod hyperliquid;
mod persistence;

pub use analysis::{ANALYSIS, AnalysisConfig, GapPolicy, HOURS_PER_YEAR};
pub use collection::{BackfillConfig, COLLECTION, CollectorConfig};
pub use hyperliquid::{ApiConfig, HYPERLIQUID};
pub use persistence::{PERSISTENCE, StorePaths};
