use std::time::Duration;

use crate::error::Result;
use crate::models::{DateRange, PriceSeries, QuoteMetrics};

pub mod index_constituents;
pub mod yahoo_client;
pub use index_constituents::{fetch_constituents, parse_constituents_csv};
pub use yahoo_client::YahooClient;

/// Simple rate limiter for API requests
pub struct ApiRateLimiter {
    delay_ms: u64,
}

impl ApiRateLimiter {
    /// A budget of 0 requests per minute disables the delay.
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            0
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

/// Source of daily history and valuation ratios
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_price_history(&self, symbol: &str, range: DateRange) -> Result<PriceSeries>;
    async fn get_quote_metrics(&self, symbol: &str) -> Result<QuoteMetrics>;
}
