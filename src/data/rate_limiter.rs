use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared request budget: at most `limit` units per fixed `window`.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<InnerLimiter>>,
}

struct InnerLimiter {
    used: u32,
    // Start of the window we are currently counting for
    window_start: Instant,
    window: Duration,
    limit: u32,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InnerLimiter {
                used: 0,
                window_start: Instant::now(),
                window,
                limit: limit.max(1),
            })),
        }
    }

    /// Acquires permission to spend `cost` units, sleeping until the next window if saturated.
    pub async fn acquire(&self, cost: u32, context: &str) {
        loop {
            let wait_duration = {
                let mut guard = self.inner.lock().await;
                let now = Instant::now();

                // 1. Roll over to a fresh window
                if now.duration_since(guard.window_start) >= guard.window {
                    guard.used = 0;
                    guard.window_start = now;
                }

                // 2. Check Capacity (an oversized cost still goes through on an empty window)
                if guard.used + cost <= guard.limit || guard.used == 0 {
                    guard.used += cost;
                    return;
                }

                // 3. Wait until the current window closes
                (guard.window_start + guard.window).saturating_duration_since(now)
            };

            log::debug!(
                "🛑 Rate limit saturated for [{}]. Waiting {:.2}s...",
                context,
                wait_duration.as_secs_f64()
            );

            tokio::time::sleep(wait_duration).await;
        }
    }
}
