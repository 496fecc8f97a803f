//! Snapshot collector: one `metaAndAssetCtxs` poll per tick, one row per symbol.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use crate::config::CollectorConfig;
use crate::data::provider::FundingDataProvider;
use crate::data::storage::RecordStore;
use crate::domain::SnapshotRow;
use crate::utils::now_utc;

pub struct SnapshotCollector<'a, P: ?Sized, S: ?Sized> {
    provider: &'a P,
    store: &'a S,
    config: CollectorConfig,
}

impl<'a, P, S> SnapshotCollector<'a, P, S>
where
    P: FundingDataProvider + ?Sized,
    S: RecordStore<SnapshotRow> + ?Sized,
{
    pub fn new(provider: &'a P, store: &'a S, config: CollectorConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Fetch and append a single poll, every row stamped with `poll_time`.
    pub async fn collect_at(&self, poll_time: DateTime<Utc>) -> Result<usize> {
        let assets = self
            .provider
            .fetch_asset_contexts()
            .await
            .context("metaAndAssetCtxs request failed")?;

        let rows: Vec<SnapshotRow> = assets
            .into_iter()
            .map(|a| SnapshotRow {
                timestamp: poll_time,
                symbol: a.symbol,
                funding_rate: a.funding_rate,
                mark_price: a.mark_price,
                day_ntl_vlm: a.day_ntl_vlm,
                open_interest: a.open_interest,
            })
            .collect();

        let outcome = self
            .store
            .merge(&rows)
            .await
            .context("Failed to append snapshot rows")?;
        Ok(outcome.inserted)
    }

    /// One tick: up to `poll_attempts` tries, then give up until the next tick.
    /// Returns whether a poll landed.
    pub async fn collect_once(&self) -> bool {
        let attempts = self.config.poll_attempts.max(1);

        for attempt in 1..=attempts {
            log::info!("Collecting funding rates (attempt {}/{})", attempt, attempts);

            match self.collect_at(now_utc()).await {
                Ok(saved) => {
                    log::info!("✅ Saved {} funding rates", saved);
                    return true;
                }
                Err(e) => {
                    log::error!("Error collecting rates: {:#}", e);
                    if attempt < attempts {
                        log::info!(
                            "Retrying in {} seconds...",
                            self.config.retry_delay.as_secs()
                        );
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        log::error!("All retry attempts failed; skipping to the next tick");
        false
    }

    /// Collect now, then every `interval` until Ctrl-C. Failed ticks are logged and skipped.
    pub async fn run_scheduler(&self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Scheduler loop that stops when `shutdown` resolves, even in the middle of a
    /// poll or its retry delay.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        log::info!("🚀 Starting funding rate collector scheduler");
        log::info!(
            "Scheduled to run every {}",
            crate::utils::format_duration(self.config.interval.as_millis() as i64)
        );

        // The first tick fires immediately.
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // One listener for the whole run.
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                signal = &mut shutdown => return Self::stopped(signal),
            }
            tokio::select! {
                _ = self.collect_once() => {}
                signal = &mut shutdown => return Self::stopped(signal),
            }
        }
    }

    fn stopped(signal: std::io::Result<()>) -> Result<()> {
        signal.context("Failed to listen for Ctrl-C")?;
        log::info!("Stopping collector...");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::data::backfill::tests::FakeUpstream;
    use crate::data::hyperliquid::AssetContext;
    use crate::data::storage::MemoryStore;

    fn asset(symbol: &str, rate: f64, oi: Option<f64>) -> AssetContext {
        AssetContext {
            symbol: symbol.into(),
            funding_rate: rate,
            mark_price: Some(1.0),
            day_ntl_vlm: None,
            open_interest: oi,
        }
    }

    fn config() -> CollectorConfig {
        CollectorConfig {
            retry_delay: Duration::ZERO,
            ..CollectorConfig::default()
        }
    }

    #[tokio::test]
    async fn poll_appends_one_row_per_symbol_tagged_with_poll_time() {
        let mut upstream = FakeUpstream::with_history("BTC", 0);
        upstream.assets = vec![asset("BTC", 0.00001, Some(5.0)), asset("ETH", -0.00002, None)];
        let store = MemoryStore::<SnapshotRow>::new();
        let collector = SnapshotCollector::new(&upstream, &store, config());

        let t1 = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap();
        assert_eq!(collector.collect_at(t1).await.unwrap(), 2);
        assert_eq!(collector.collect_at(t2).await.unwrap(), 2);

        let rows = store.load_symbol("ETH").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, t1);
        assert_eq!(rows[1].funding_rate, -0.00002);
    }

    #[tokio::test]
    async fn top_symbols_sorted_by_open_interest() {
        let mut upstream = FakeUpstream::with_history("BTC", 0);
        upstream.assets = vec![
            asset("A", 0.0, Some(1.0)),
            asset("B", 0.0, Some(30.0)),
            asset("C", 0.0, None),
            asset("D", 0.0, Some(7.0)),
        ];
        assert_eq!(
            upstream.top_symbols_by_open_interest(2).await.unwrap(),
            vec!["B".to_string(), "D".to_string()]
        );
        assert_eq!(upstream.list_symbols().await.unwrap().len(), 4);
    }

    struct DownUpstream;

    #[async_trait::async_trait]
    impl FundingDataProvider for DownUpstream {
        async fn fetch_funding_page(
            &self,
            _symbol: &str,
            _start_time_ms: i64,
        ) -> Result<crate::data::hyperliquid::FundingPage, crate::data::hyperliquid::ApiError>
        {
            Err(crate::data::hyperliquid::ApiError::Malformed("down".into()))
        }

        async fn fetch_asset_contexts(
            &self,
        ) -> Result<Vec<AssetContext>, crate::data::hyperliquid::ApiError> {
            Err(crate::data::hyperliquid::ApiError::Malformed("down".into()))
        }
    }

    #[tokio::test]
    async fn failed_tick_is_logged_and_skipped_not_fatal() {
        let store = MemoryStore::<SnapshotRow>::new();
        let collector = SnapshotCollector::new(&DownUpstream, &store, config());

        assert!(!collector.collect_once().await);
        assert_eq!(store.len().await, 0);
    }

    /// Counts polls; fails every one when `down` is set.
    struct CountingUpstream {
        down: bool,
        polls: std::sync::atomic::AtomicUsize,
    }

    impl CountingUpstream {
        fn new(down: bool) -> Self {
            Self {
                down,
                polls: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn polls(&self) -> usize {
            self.polls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl FundingDataProvider for CountingUpstream {
        async fn fetch_funding_page(
            &self,
            _symbol: &str,
            _start_time_ms: i64,
        ) -> Result<crate::data::hyperliquid::FundingPage, crate::data::hyperliquid::ApiError>
        {
            Ok(crate::data::hyperliquid::FundingPage::default())
        }

        async fn fetch_asset_contexts(
            &self,
        ) -> Result<Vec<AssetContext>, crate::data::hyperliquid::ApiError> {
            self.polls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if self.down {
                return Err(crate::data::hyperliquid::ApiError::Malformed("down".into()));
            }
            Ok(vec![asset("BTC", 0.00001, Some(1.0))])
        }
    }

    async fn stop_after(delay: Duration) -> std::io::Result<()> {
        tokio::time::sleep(delay).await;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_a_retry_delay() {
        let upstream = CountingUpstream::new(true);
        let store = MemoryStore::<SnapshotRow>::new();
        let collector = SnapshotCollector::new(
            &upstream,
            &store,
            CollectorConfig {
                interval: Duration::from_secs(3600),
                poll_attempts: 3,
                retry_delay: Duration::from_secs(30),
            },
        );

        // Stop lands 10s into the first 30s retry delay.
        collector
            .run_until(stop_after(Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(upstream.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_polls_each_interval_until_shutdown() {
        let upstream = CountingUpstream::new(false);
        let store = MemoryStore::<SnapshotRow>::new();
        let collector = SnapshotCollector::new(
            &upstream,
            &store,
            CollectorConfig {
                interval: Duration::from_secs(3600),
                ..config()
            },
        );

        // Ticks at 0 and 60 minutes, stop at 90.
        collector
            .run_until(stop_after(Duration::from_secs(90 * 60)))
            .await
            .unwrap();
        assert_eq!(upstream.polls(), 2);
    }

    #[tokio::test]
    async fn failed_shutdown_listener_is_an_error() {
        let store = MemoryStore::<SnapshotRow>::new();
        let collector = SnapshotCollector::new(&DownUpstream, &store, config());
        let result = collector
            .run_until(async { Err(std::io::Error::other("no signal handler")) })
            .await;
        assert!(result.is_err());
    }
}
