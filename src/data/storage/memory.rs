use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{MergeOutcome, RecordStore, partition_fresh, sort_records};
use crate::domain::{ObservationKey, Record};

/// In-process table for tests and dry runs.
pub struct MemoryStore<R> {
    inner: Mutex<MemoryInner<R>>,
}

struct MemoryInner<R> {
    rows: Vec<R>,
    keys: HashSet<ObservationKey>,
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                rows: Vec::new(),
                keys: HashSet::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn merge(&self, records: &[R]) -> Result<MergeOutcome> {
        let mut guard = self.inner.lock().await;
        let (fresh, batch_keys, duplicates) = partition_fresh(&guard.keys, records);
        let inserted = fresh.len();
        guard.rows.extend(fresh);
        guard.keys.extend(batch_keys);
        Ok(MergeOutcome {
            inserted,
            duplicates,
        })
    }

    async fn load_all(&self) -> Result<Vec<R>> {
        let mut rows = self.inner.lock().await.rows.clone();
        sort_records(&mut rows);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::test_support::{hour, obs};
    use crate::domain::FundingObservation;

    #[tokio::test]
    async fn merging_same_page_twice_is_idempotent() {
        let store = MemoryStore::<FundingObservation>::new();
        let page = vec![obs("BTC", 0, 0.1), obs("BTC", 1, 0.2), obs("ETH", 0, 0.3)];

        let first = store.merge(&page).await.unwrap();
        let once = store.load_all().await.unwrap();
        let second = store.merge(&page).await.unwrap();

        assert_eq!(first, MergeOutcome { inserted: 3, duplicates: 0 });
        assert_eq!(second, MergeOutcome { inserted: 0, duplicates: 3 });
        assert_eq!(store.load_all().await.unwrap(), once);
    }

    #[tokio::test]
    async fn existing_row_is_never_overwritten() {
        let store = MemoryStore::<FundingObservation>::new();
        store.merge(&[obs("BTC", 0, 0.1)]).await.unwrap();
        store.merge(&[obs("BTC", 0, 0.9)]).await.unwrap();

        let rows = store.load_symbol("BTC").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hourly_rate, 0.1);
    }

    #[tokio::test]
    async fn queries_by_symbol_range_and_last_timestamp() {
        let store = MemoryStore::<FundingObservation>::new();
        store
            .merge(&[obs("ETH", 2, 0.0), obs("BTC", 3, 0.0), obs("BTC", 1, 0.0)])
            .await
            .unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all[0].symbol, "BTC");
        assert_eq!(all[0].timestamp, hour(1));

        let ranged = store.load_range(Some(hour(2)), Some(hour(3))).await.unwrap();
        assert_eq!(ranged.len(), 2);

        assert_eq!(store.last_timestamp("BTC").await.unwrap(), Some(hour(3)));
        assert_eq!(store.last_timestamp("SOL").await.unwrap(), None);
    }
}
