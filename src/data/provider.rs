use async_trait::async_trait;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::data::RateLimiter;
use crate::data::hyperliquid::{
    ApiError, AssetContext, FundingPage, InfoRequest, decode_asset_contexts, decode_funding_page,
};

/// Abstract interface for fetching funding data.
#[async_trait]
pub trait FundingDataProvider: Send + Sync {
    /// One page of funding history for `symbol`, starting at `start_time_ms` (inclusive).
    async fn fetch_funding_page(
        &self,
        symbol: &str,
        start_time_ms: i64,
    ) -> Result<FundingPage, ApiError>;

    /// Current funding, price, volume and open interest for every listed perp.
    async fn fetch_asset_contexts(&self) -> Result<Vec<AssetContext>, ApiError>;

    async fn list_symbols(&self) -> Result<Vec<String>, ApiError> {
        Ok(self
            .fetch_asset_contexts()
            .await?
            .into_iter()
            .map(|a| a.symbol)
            .collect())
    }

    /// Symbols with the largest open interest, largest first.
    async fn top_symbols_by_open_interest(&self, limit: usize) -> Result<Vec<String>, ApiError> {
        let mut assets = self.fetch_asset_contexts().await?;
        assets.sort_by(|a, b| {
            b.open_interest
                .unwrap_or(0.0)
                .total_cmp(&a.open_interest.unwrap_or(0.0))
        });
        Ok(assets.into_iter().take(limit).map(|a| a.symbol).collect())
    }
}

pub struct HyperliquidProvider {
    client: reqwest::Client,
    config: ApiConfig,
    limiter: RateLimiter,
}

impl HyperliquidProvider {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let limiter = RateLimiter::new(config.requests_per_window, config.window);
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    async fn post_info(
        &self,
        request: &InfoRequest,
        timeout: std::time::Duration,
        context: &str,
    ) -> Result<Value, ApiError> {
        self.limiter.acquire(1, context).await;

        let response = self
            .client
            .post(&self.config.info_url)
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl FundingDataProvider for HyperliquidProvider {
    async fn fetch_funding_page(
        &self,
        symbol: &str,
        start_time_ms: i64,
    ) -> Result<FundingPage, ApiError> {
        let request = InfoRequest::FundingHistory {
            coin: symbol.to_string(),
            start_time: start_time_ms,
        };
        let body = self
            .post_info(&request, self.config.history_timeout, symbol)
            .await?;
        decode_funding_page(body, symbol)
    }

    async fn fetch_asset_contexts(&self) -> Result<Vec<AssetContext>, ApiError> {
        let body = self
            .post_info(&InfoRequest::MetaAndAssetCtxs, self.config.timeout, "metaAndAssetCtxs")
            .await?;
        decode_asset_contexts(body)
    }
}
