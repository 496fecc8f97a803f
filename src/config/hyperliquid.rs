use std::time::Duration;

/// REST constraints: 500 funding records per page, 2 requests per second.
pub struct RestLimits {
    pub history_page_limit: usize,
    pub requests_per_window: u32,
    pub window_ms: u64,
}

pub struct ClientDefaults {
    pub timeout_ms: u64,
    pub history_timeout_ms: u64,
}

pub struct HyperliquidConfig {
    pub info_url: &'static str,
    pub limits: RestLimits,
    pub client: ClientDefaults,
}

pub const HYPERLIQUID: HyperliquidConfig = HyperliquidConfig {
    info_url: "https://api.hyperliquid.xyz/info",
    limits: RestLimits {
        history_page_limit: 500,
        requests_per_window: 2,
        window_ms: 1000,
    },
    client: ClientDefaults {
        timeout_ms: 30_000,
        history_timeout_ms: 60_000,
    },
};

/// Runtime HTTP settings handed to `HyperliquidProvider`.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub info_url: String,
    pub timeout: Duration,
    pub history_timeout: Duration,
    pub requests_per_window: u32,
    pub window: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            info_url: HYPERLIQUID.info_url.to_string(),
            timeout: Duration::from_millis(HYPERLIQUID.client.timeout_ms),
            history_timeout: Duration::from_millis(HYPERLIQUID.client.history_timeout_ms),
            requests_per_window: HYPERLIQUID.limits.requests_per_window,
            window: Duration::from_millis(HYPERLIQUID.limits.window_ms),
        }
    }
}
