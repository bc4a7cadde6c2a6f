//! In-memory market data provider

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use stock_trends::api::MarketDataProvider;
use stock_trends::error::{AnalysisError, Result};
use stock_trends::models::{DateRange, PriceSeries, QuoteMetrics};

/// Serves canned histories and fundamentals; unknown symbols fail like a
/// delisted ticker would.
#[derive(Default)]
pub struct StaticProvider {
    histories: HashMap<String, PriceSeries>,
    metrics: HashMap<String, QuoteMetrics>,
    requests: Mutex<Vec<String>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, series: PriceSeries) -> Self {
        self.histories.insert(series.symbol.clone(), series);
        self
    }

    pub fn with_metrics(mut self, symbol: &str, pe_ratio: Option<f64>, peg_ratio: Option<f64>) -> Self {
        self.metrics.insert(
            symbol.to_string(),
            QuoteMetrics {
                symbol: symbol.to_string(),
                pe_ratio,
                peg_ratio,
            },
        );
        self
    }

    /// Symbols requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, request: String) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn get_price_history(&self, symbol: &str, range: DateRange) -> Result<PriceSeries> {
        self.record(format!("history:{}", symbol));
        let series = self
            .histories
            .get(symbol)
            .ok_or_else(|| AnalysisError::provider(symbol, "No data found, symbol may be delisted"))?;

        let bars = series
            .bars()
            .iter()
            .filter(|bar| range.contains(bar.date))
            .cloned()
            .collect();
        Ok(PriceSeries::new(symbol, bars))
    }

    async fn get_quote_metrics(&self, symbol: &str) -> Result<QuoteMetrics> {
        self.record(format!("metrics:{}", symbol));
        self.metrics
            .get(symbol)
            .cloned()
            .ok_or_else(|| AnalysisError::provider(symbol, "Quote not found"))
    }
}
