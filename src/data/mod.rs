pub mod backfill;
pub mod collector;
pub mod hyperliquid;
mod provider;
mod rate_limiter;
pub mod storage;

pub use {
    backfill::{Backfill, BackfillOutcome, BackfillReport, SymbolBackfill},
    collector::SnapshotCollector,
    hyperliquid::{ApiError, AssetContext, FundingPage},
    provider::{FundingDataProvider, HyperliquidProvider},
    rate_limiter::RateLimiter,
    storage::{
        CsvStore, MemoryStore, MergeOutcome, RecordStore, SqliteStore, StoreKind, open_history_store,
    },
};
