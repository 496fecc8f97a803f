use std::time::Duration;

pub struct RetryDefaults {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

pub struct CollectionConfig {
    pub interval_hours: u64,
    pub retry: RetryDefaults,
    pub top_symbols_limit: usize,
}

pub const COLLECTION: CollectionConfig = CollectionConfig {
    interval_hours: 1,
    retry: RetryDefaults {
        max_attempts: 3,
        retry_delay_secs: 30,
    },
    top_symbols_limit: 10,
};

/// Settings for one history backfill run.
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// Inclusive start cursor in epoch ms. 0 means "from inception".
    pub start_time_ms: i64,
    /// Continue each symbol from its last stored timestamp instead of `start_time_ms`.
    pub resume: bool,
    /// Attempts per page (first try included) before the symbol is abandoned.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// A page this long means "more data follows".
    pub page_limit: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            start_time_ms: 0,
            resume: false,
            max_attempts: COLLECTION.retry.max_attempts,
            retry_delay: Duration::from_secs(COLLECTION.retry.retry_delay_secs),
            page_limit: super::HYPERLIQUID.limits.history_page_limit,
        }
    }
}

/// Settings for the snapshot collector loop.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub interval: Duration,
    /// Attempts per tick before the tick is skipped.
    pub poll_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(COLLECTION.interval_hours * 3600),
            poll_attempts: COLLECTION.retry.max_attempts,
            retry_delay: Duration::from_secs(COLLECTION.retry.retry_delay_secs),
        }
    }
}
