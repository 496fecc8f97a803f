use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite identity of a stored row: at most one row per (symbol, timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationKey {
    pub symbol: String,
    pub timestamp_ms: i64,
}

/// Anything a `RecordStore` can hold.
pub trait Record: Clone + Send + Sync + 'static {
    fn symbol(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;

    fn key(&self) -> ObservationKey {
        ObservationKey {
            symbol: self.symbol().to_string(),
            timestamp_ms: self.timestamp().timestamp_millis(),
        }
    }
}

/// One hourly funding settlement for one symbol, as returned by `fundingHistory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingObservation {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    /// Signed fraction paid per hour (longs pay shorts when positive).
    #[serde(rename = "funding_rate")]
    pub hourly_rate: f64,
    pub premium: Option<f64>,
    pub mark_price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub open_interest: Option<f64>,
}

impl FundingObservation {
    /// History rows only carry rate and premium.
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, hourly_rate: f64) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            hourly_rate,
            premium: None,
            mark_price: None,
            volume_24h: None,
            open_interest: None,
        }
    }

    pub fn with_premium(mut self, premium: Option<f64>) -> Self {
        self.premium = premium;
        self
    }
}

impl Record for FundingObservation {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// One symbol's current state at poll time, as returned by `metaAndAssetCtxs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Poll time, identical for every row of one poll.
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub funding_rate: f64,
    pub mark_price: Option<f64>,
    pub day_ntl_vlm: Option<f64>,
    pub open_interest: Option<f64>,
}

impl Record for SnapshotRow {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_uses_symbol_and_epoch_ms() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let obs = FundingObservation::new("BTC", ts, 0.0000125);
        assert_eq!(
            obs.key(),
            ObservationKey {
                symbol: "BTC".into(),
                timestamp_ms: 1_735_718_400_000,
            }
        );
    }
}
