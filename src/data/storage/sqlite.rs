use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    ConnectOptions, Pool, QueryBuilder, Row, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous},
};

use super::{MergeOutcome, RecordStore};
use crate::domain::FundingObservation;
use crate::utils::epoch_ms_to_datetime;

const SELECT_COLUMNS: &str =
    "SELECT symbol, timestamp_ms, funding_rate, premium, mark_price, volume_24h, open_interest FROM funding_history";

/// SQLite copy of the history table; the primary key does the dedup.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let connection_options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(60))
            .synchronous(SqliteSynchronous::Normal)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(connection_options)
            .await
            .with_context(|| format!("Failed to open SQLite store {}", db_path.display()))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS funding_history (
                symbol TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                funding_rate REAL NOT NULL,
                premium REAL,
                mark_price REAL,
                volume_24h REAL,
                open_interest REAL,
                PRIMARY KEY (symbol, timestamp_ms)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create funding_history table")?;

        Ok(())
    }

    fn decode_rows(rows: &[SqliteRow]) -> Vec<FundingObservation> {
        rows.iter()
            .filter_map(|row| {
                let timestamp = epoch_ms_to_datetime(row.try_get("timestamp_ms").ok()?)?;
                Some(FundingObservation {
                    timestamp,
                    symbol: row.try_get("symbol").ok()?,
                    hourly_rate: row.try_get("funding_rate").ok()?,
                    premium: row.try_get("premium").ok()?,
                    mark_price: row.try_get("mark_price").ok()?,
                    volume_24h: row.try_get("volume_24h").ok()?,
                    open_interest: row.try_get("open_interest").ok()?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore<FundingObservation> for SqliteStore {
    /// Batches rows in chunks of 2000 to stay within SQLite's 32k parameter limit.
    async fn merge(&self, records: &[FundingObservation]) -> Result<MergeOutcome> {
        let mut inserted = 0usize;

        for chunk in records.chunks(2000) {
            let mut query_builder = QueryBuilder::<Sqlite>::new(
                "INSERT OR IGNORE INTO funding_history (symbol, timestamp_ms, funding_rate, premium, mark_price, volume_24h, open_interest) ",
            );

            query_builder.push_values(chunk, |mut b, o| {
                b.push_bind(o.symbol.clone())
                    .push_bind(o.timestamp.timestamp_millis())
                    .push_bind(o.hourly_rate)
                    .push_bind(o.premium)
                    .push_bind(o.mark_price)
                    .push_bind(o.volume_24h)
                    .push_bind(o.open_interest);
            });

            let result = query_builder.build().execute(&self.pool).await?;
            inserted += result.rows_affected() as usize;
        }

        Ok(MergeOutcome {
            inserted,
            duplicates: records.len() - inserted,
        })
    }

    async fn load_all(&self) -> Result<Vec<FundingObservation>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY symbol ASC, timestamp_ms ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::decode_rows(&rows))
    }

    async fn load_symbol(&self, symbol: &str) -> Result<Vec<FundingObservation>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE symbol = ? ORDER BY timestamp_ms ASC"
        ))
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;
        Ok(Self::decode_rows(&rows))
    }

    async fn load_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<FundingObservation>> {
        let start_ms = start.map_or(i64::MIN, |s| s.timestamp_millis());
        let end_ms = end.map_or(i64::MAX, |e| e.timestamp_millis());
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE timestamp_ms >= ? AND timestamp_ms <= ? ORDER BY symbol ASC, timestamp_ms ASC"
        ))
        .bind(start_ms)
        .bind(end_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(Self::decode_rows(&rows))
    }

    async fn last_timestamp(&self, symbol: &str) -> Result<Option<DateTime<Utc>>> {
        let result = sqlx::query(
            r#"
            SELECT MAX(timestamp_ms) as last_time
            FROM funding_history
            WHERE symbol = ?
            "#,
        )
        .bind(symbol)
        .fetch_one(&self.pool)
        .await?;

        let last_time: Option<i64> = result.try_get("last_time")?;
        Ok(last_time.and_then(epoch_ms_to_datetime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::test_support::{hour, obs};

    #[tokio::test]
    async fn primary_key_drops_duplicates_keep_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("history.sqlite")).await.unwrap();

        let page = vec![
            obs("BTC", 0, 0.1).with_premium(Some(0.01)),
            obs("BTC", 1, 0.2),
            obs("BTC", 1, 0.7),
        ];
        assert_eq!(
            store.merge(&page).await.unwrap(),
            MergeOutcome { inserted: 2, duplicates: 1 }
        );
        assert_eq!(
            store.merge(&page).await.unwrap(),
            MergeOutcome { inserted: 0, duplicates: 3 }
        );

        let rows = store.load_symbol("BTC").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].premium, Some(0.01));
        assert_eq!(rows[1].hourly_rate, 0.2);
        assert_eq!(store.last_timestamp("BTC").await.unwrap(), Some(hour(1)));
        assert_eq!(store.last_timestamp("ETH").await.unwrap(), None);
    }

    #[tokio::test]
    async fn range_query_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("history.sqlite")).await.unwrap();
        store
            .merge(&[obs("ETH", 0, 0.0), obs("BTC", 1, 0.0), obs("BTC", 2, 0.0)])
            .await
            .unwrap();

        let rows = store.load_range(Some(hour(1)), Some(hour(2))).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.symbol == "BTC"));
        assert_eq!(store.load_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn mistyped_row_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("history.sqlite")).await.unwrap();
        store.merge(&[obs("BTC", 0, 0.0001)]).await.unwrap();

        // Written by some other tool: text where a REAL belongs.
        sqlx::query(
            "INSERT INTO funding_history (symbol, timestamp_ms, funding_rate) VALUES ('BTC', ?, 'oops')",
        )
        .bind(hour(1).timestamp_millis())
        .execute(&store.pool)
        .await
        .unwrap();

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hourly_rate, 0.0001);
    }
}
