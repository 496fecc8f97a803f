//! Append-only keyed tables. Every backend drops a row whose (symbol, timestamp)
//! key is already present, so merging the same batch twice is a no-op.

mod csv_store;
mod memory;
mod sqlite;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ObservationKey, Record};

pub use csv_store::CsvStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::StorePaths;
use crate::domain::FundingObservation;

/// Backend holding the funding history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StoreKind {
    #[default]
    Csv,
    Sqlite,
}

/// Opens the history store of `kind` under `paths`, creating it if missing.
pub async fn open_history_store(
    kind: StoreKind,
    paths: &StorePaths,
) -> Result<Box<dyn RecordStore<FundingObservation>>> {
    let store: Box<dyn RecordStore<FundingObservation>> = match kind {
        StoreKind::Csv => {
            let path = paths.history_csv();
            log::info!("History store: {}", path.display());
            Box::new(CsvStore::<FundingObservation>::open(path).await?)
        }
        StoreKind::Sqlite => {
            let path = paths.history_sqlite();
            log::info!("History store: {}", path.display());
            Box::new(SqliteStore::new(path).await?)
        }
    };
    Ok(store)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

impl MergeOutcome {
    pub fn absorb(&mut self, other: MergeOutcome) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
    }
}

#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Appends rows whose key is new. Existing keys win; inside one batch the first row wins.
    async fn merge(&self, records: &[R]) -> Result<MergeOutcome>;

    /// Every row, ordered by (symbol, timestamp).
    async fn load_all(&self) -> Result<Vec<R>>;

    async fn load_symbol(&self, symbol: &str) -> Result<Vec<R>> {
        let mut rows = self.load_all().await?;
        rows.retain(|r| r.symbol() == symbol);
        Ok(rows)
    }

    /// Rows with `start <= timestamp <= end`; `None` leaves that side open.
    async fn load_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<R>> {
        let mut rows = self.load_all().await?;
        rows.retain(|r| in_range(r.timestamp(), start, end));
        Ok(rows)
    }

    async fn last_timestamp(&self, symbol: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .load_symbol(symbol)
            .await?
            .iter()
            .map(Record::timestamp)
            .max())
    }
}

pub(crate) fn in_range(
    ts: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.is_none_or(|s| ts >= s) && end.is_none_or(|e| ts <= e)
}

pub(crate) fn sort_records<R: Record>(rows: &mut [R]) {
    rows.sort_by(|a, b| {
        a.symbol()
            .cmp(b.symbol())
            .then_with(|| a.timestamp().cmp(&b.timestamp()))
    });
}

/// Splits `records` into rows with unseen keys (first occurrence only) and a duplicate count.
/// `known` is left untouched; the caller commits `batch_keys` once the write succeeds.
pub(crate) fn partition_fresh<R: Record>(
    known: &HashSet<ObservationKey>,
    records: &[R],
) -> (Vec<R>, HashSet<ObservationKey>, usize) {
    let mut batch_keys = HashSet::new();
    let mut fresh = Vec::new();
    let mut duplicates = 0;

    for record in records {
        let key = record.key();
        if known.contains(&key) || !batch_keys.insert(key) {
            duplicates += 1;
        } else {
            fresh.push(record.clone());
        }
    }

    (fresh, batch_keys, duplicates)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::domain::FundingObservation;

    pub fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(h)
    }

    pub fn obs(symbol: &str, h: i64, rate: f64) -> FundingObservation {
        FundingObservation::new(symbol, hour(h), rate)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{hour, obs};
    use super::*;

    #[test]
    fn partition_keeps_first_within_batch_and_skips_known() {
        let known: HashSet<_> = [obs("BTC", 0, 0.1).key()].into_iter().collect();
        let batch = vec![
            obs("BTC", 0, 0.9),
            obs("BTC", 1, 0.2),
            obs("BTC", 1, 0.3),
            obs("ETH", 1, 0.4),
        ];

        let (fresh, keys, duplicates) = partition_fresh(&known, &batch);
        assert_eq!(duplicates, 2);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].hourly_rate, 0.2);
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn range_bounds_are_inclusive_and_optional() {
        assert!(in_range(hour(5), Some(hour(5)), Some(hour(5))));
        assert!(!in_range(hour(6), None, Some(hour(5))));
        assert!(in_range(hour(6), None, None));
    }

    #[tokio::test]
    async fn history_store_reopens_for_either_backend() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::new(dir.path());

        for kind in [StoreKind::Csv, StoreKind::Sqlite] {
            let store = open_history_store(kind, &paths).await.unwrap();
            store.merge(&[obs("BTC", 0, 0.1), obs("BTC", 1, 0.2)]).await.unwrap();
            drop(store);

            let reopened = open_history_store(kind, &paths).await.unwrap();
            assert_eq!(reopened.load_all().await.unwrap().len(), 2, "{:?}", kind);
            assert_eq!(reopened.last_timestamp("BTC").await.unwrap(), Some(hour(1)));
        }
        assert!(paths.history_csv().exists());
        assert!(paths.history_sqlite().exists());
    }
}
