use tracing::{debug, error, info, warn};

use crate::api::MarketDataProvider;
use crate::error::{AnalysisError, Result};
use crate::models::{DateRange, PriceSeries, PriceTable};
use crate::price_cache::PriceCache;

/// Sequential price retrieval on top of a [`MarketDataProvider`]
pub struct DataCollector<P> {
    provider: P,
}

/// Result of a cache sync run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncResult {
    pub total_stocks: usize,
    pub stored_stocks: usize,
    pub failed_stocks: usize,
    pub total_records: usize,
}

impl<P: MarketDataProvider> DataCollector<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch daily history for every ticker and join it on date.
    ///
    /// One attempt per ticker, in order; the first failure fails the batch.
    /// An empty history counts as a failure.
    pub async fn fetch_price_table(&self, tickers: &[String], range: DateRange) -> Result<PriceTable> {
        if tickers.is_empty() {
            return Err(AnalysisError::invalid("at least one ticker is required"));
        }
        range.validate()?;

        info!("📈 Fetching {} tickers from {} to {}", tickers.len(), range.start, range.end);

        let mut series: Vec<PriceSeries> = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let history = self.provider.get_price_history(ticker, range).await?;
            if history.is_empty() {
                return Err(AnalysisError::provider(ticker.as_str(), "no price data returned"));
            }
            debug!("{}: {} bars", ticker, history.len());
            // keep the requested name even if the provider normalizes it
            series.push(PriceSeries::new(ticker.clone(), history.bars().to_vec()));
        }

        let table = PriceTable::from_series(series);
        info!("✅ Retrieved {} trading days for {} tickers", table.len(), tickers.len());
        Ok(table)
    }

    /// Like [`fetch_price_table`](Self::fetch_price_table), but logs the failure
    /// and returns `None` so callers can skip downstream work.
    pub async fn retrieve(&self, tickers: &[String], range: DateRange) -> Option<PriceTable> {
        match self.fetch_price_table(tickers, range).await {
            Ok(table) => Some(table),
            Err(e) => {
                error!("Error occurred while retrieving stock data: {}", e);
                None
            }
        }
    }

    /// Download history for each ticker into the local cache, one at a time.
    /// Files are keyed by the bare ticker; requests use `ticker + symbol_suffix`.
    pub async fn sync_cache(
        &self,
        tickers: &[String],
        symbol_suffix: &str,
        range: DateRange,
        cache: &PriceCache,
    ) -> Result<SyncResult> {
        range.validate()?;

        let mut result = SyncResult {
            total_stocks: tickers.len(),
            ..SyncResult::default()
        };

        info!("💾 Syncing {} tickers into {}", tickers.len(), cache.dir().display());

        for (index, ticker) in tickers.iter().enumerate() {
            let symbol = format!("{}{}", ticker, symbol_suffix);

            let stored = match self.provider.get_price_history(&symbol, range).await {
                Ok(series) if series.is_empty() => {
                    Err(AnalysisError::missing_metric(symbol.as_str(), "price history"))
                }
                Ok(series) => cache.store(ticker, &series),
                Err(e) => Err(e),
            };

            match stored {
                Ok(records) => {
                    result.stored_stocks += 1;
                    result.total_records += records;
                    info!("✅ {}/{}: {} - {} records", index + 1, tickers.len(), ticker, records);
                }
                Err(e) => {
                    result.failed_stocks += 1;
                    warn!("❌ {}/{}: {} failed - {}", index + 1, tickers.len(), ticker, e);
                }
            }
        }

        info!("📊 Results: {} stored, {} failed, {} records",
              result.stored_stocks, result.failed_stocks, result.total_records);
        Ok(result)
    }
}
