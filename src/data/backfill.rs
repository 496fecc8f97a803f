//! Funding-history backfill: page forward through `fundingHistory` per symbol and
//! merge every page into the store as it arrives.

use std::fmt;

use crate::config::BackfillConfig;
use crate::data::hyperliquid::FundingPage;
use crate::data::provider::FundingDataProvider;
use crate::data::storage::{MergeOutcome, RecordStore};
use crate::domain::FundingObservation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillOutcome {
    Complete,
    /// Retries ran out (or the store refused a page); earlier pages are kept.
    Abandoned(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolBackfill {
    pub symbol: String,
    pub requests: usize,
    pub fetched: usize,
    pub dropped: usize,
    pub merged: MergeOutcome,
    pub outcome: BackfillOutcome,
}

impl SymbolBackfill {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            requests: 0,
            fetched: 0,
            dropped: 0,
            merged: MergeOutcome::default(),
            outcome: BackfillOutcome::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == BackfillOutcome::Complete
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackfillReport {
    pub symbols: Vec<SymbolBackfill>,
}

impl BackfillReport {
    pub fn inserted(&self) -> usize {
        self.symbols.iter().map(|s| s.merged.inserted).sum()
    }

    pub fn requests(&self) -> usize {
        self.symbols.iter().map(|s| s.requests).sum()
    }

    pub fn abandoned(&self) -> Vec<&str> {
        self.symbols
            .iter()
            .filter(|s| !s.is_complete())
            .map(|s| s.symbol.as_str())
            .collect()
    }
}

impl fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} symbol(s), {} request(s), {} new row(s), {} abandoned",
            self.symbols.len(),
            self.requests(),
            self.inserted(),
            self.abandoned().len()
        )
    }
}

pub struct Backfill<'a, P: ?Sized, S: ?Sized> {
    provider: &'a P,
    store: &'a S,
    config: BackfillConfig,
}

impl<'a, P, S> Backfill<'a, P, S>
where
    P: FundingDataProvider + ?Sized,
    S: RecordStore<FundingObservation> + ?Sized,
{
    pub fn new(provider: &'a P, store: &'a S, config: BackfillConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Symbols run one after another. A failed symbol never stops the others.
    pub async fn run(&self, symbols: &[String]) -> BackfillReport {
        let mut report = BackfillReport::default();
        let total = symbols.len();

        for (idx, symbol) in symbols.iter().enumerate() {
            log::info!("Fetching {}/{}: {}...", idx + 1, total, symbol);
            let result = self.backfill_symbol(symbol).await;
            match &result.outcome {
                BackfillOutcome::Complete => log::info!(
                    "  Got {} entries for {} ({} new, {} already stored)",
                    result.fetched,
                    symbol,
                    result.merged.inserted,
                    result.merged.duplicates
                ),
                BackfillOutcome::Abandoned(reason) => log::error!(
                    "  Abandoned {} after {} request(s), {} row(s) kept: {}",
                    symbol,
                    result.requests,
                    result.merged.inserted,
                    reason
                ),
            }
            report.symbols.push(result);
        }

        report
    }

    async fn start_cursor(&self, symbol: &str) -> i64 {
        if !self.config.resume {
            return self.config.start_time_ms;
        }
        match self.store.last_timestamp(symbol).await {
            Ok(Some(last)) => self.config.start_time_ms.max(last.timestamp_millis() + 1),
            Ok(None) => self.config.start_time_ms,
            Err(e) => {
                log::warn!(
                    "⚠ Could not read last stored time for {}, starting from {}: {:#}",
                    symbol,
                    self.config.start_time_ms,
                    e
                );
                self.config.start_time_ms
            }
        }
    }

    pub async fn backfill_symbol(&self, symbol: &str) -> SymbolBackfill {
        let mut progress = SymbolBackfill::new(symbol);
        let mut cursor = self.start_cursor(symbol).await;

        loop {
            let page = match self.fetch_with_retry(symbol, cursor, &mut progress).await {
                Ok(page) => page,
                Err(reason) => {
                    progress.outcome = BackfillOutcome::Abandoned(reason);
                    return progress;
                }
            };

            progress.fetched += page.observations.len();
            progress.dropped += page.dropped;

            if !page.observations.is_empty() {
                match self.store.merge(&page.observations).await {
                    Ok(outcome) => progress.merged.absorb(outcome),
                    Err(e) => {
                        progress.outcome =
                            BackfillOutcome::Abandoned(format!("store merge failed: {:#}", e));
                        return progress;
                    }
                }
            }

            // A short (or empty) page is the end of history.
            if page.raw_len < self.config.page_limit {
                return progress;
            }

            match page.last_time_ms {
                Some(last) if last >= cursor => cursor = last + 1,
                _ => {
                    log::warn!(
                        "⚠ Full page for {} did not advance past cursor {}; stopping",
                        symbol,
                        cursor
                    );
                    return progress;
                }
            }
        }
    }

    /// Same cursor on every attempt. Returns the last error text once attempts are spent.
    async fn fetch_with_retry(
        &self,
        symbol: &str,
        cursor: i64,
        progress: &mut SymbolBackfill,
    ) -> Result<FundingPage, String> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            progress.requests += 1;
            match self.provider.fetch_funding_page(symbol, cursor).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < max_attempts => {
                    log::warn!(
                        "  Attempt {} failed for {}: {}. Retrying in {}s...",
                        attempt,
                        symbol,
                        e,
                        self.config.retry_delay.as_secs()
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    return Err(format!(
                        "failed after {} attempt(s) at cursor {}: {}",
                        max_attempts, cursor, e
                    ));
                }
            }
        }

        Err(format!("no attempt made for {}", symbol))
    }
}
