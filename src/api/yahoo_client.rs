use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use super::{ApiRateLimiter, MarketDataProvider};
use crate::error::{AnalysisError, Result};
use crate::models::{Config, DateRange, PriceBar, PriceSeries, QuoteMetrics};

/// Error object Yahoo embeds in chart and quoteSummary bodies
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    code: Option<String>,
    description: Option<String>,
}

impl std::fmt::Display for ProviderErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("error"),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteIndicators>,
    #[serde(default)]
    adjclose: Vec<AdjCloseIndicators>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteIndicators {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseIndicators {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "summaryDetail")]
    summary_detail: Option<SummaryDetail>,
    #[serde(rename = "defaultKeyStatistics")]
    key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct KeyStatistics {
    #[serde(rename = "pegRatio")]
    peg_ratio: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

/// Yahoo Finance chart and quoteSummary client
pub struct YahooClient {
    client: Client,
    chart_base_url: Url,
    quote_base_url: Url,
    cookie_url: Url,
    rate_limiter: ApiRateLimiter,
    crumb: OnceCell<String>,
}

impl YahooClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            chart_base_url: Url::parse(&config.chart_base_url)?,
            quote_base_url: Url::parse(&config.quote_base_url)?,
            cookie_url: Url::parse(&config.cookie_url)?,
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
            crumb: OnceCell::new(),
        })
    }

    fn endpoint(&self, base: &Url, segments: &[&str], symbol: &str) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| AnalysisError::provider(symbol, format!("base URL {} cannot hold a path", base)))?
            .pop_if_empty()
            .extend(segments)
            .push(symbol);
        Ok(url)
    }

    fn chart_url(&self, symbol: &str, range: DateRange) -> Result<Url> {
        // Midnight UTC on both ends; the end day itself is excluded
        let period1 = range
            .start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = range
            .end
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        let mut url = self.endpoint(&self.chart_base_url, &["v8", "finance", "chart"], symbol)?;
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    fn quote_summary_url(&self, symbol: &str, crumb: &str) -> Result<Url> {
        let mut url = self.endpoint(&self.quote_base_url, &["v10", "finance", "quoteSummary"], symbol)?;
        url.query_pairs_mut()
            .append_pair("modules", "summaryDetail,defaultKeyStatistics")
            .append_pair("crumb", crumb);
        Ok(url)
    }

    /// quoteSummary rejects requests without a crumb tied to the session
    /// cookie. Obtained on first use and reused for the client's lifetime;
    /// a failed handshake is retried on the next call.
    async fn crumb(&self, symbol: &str) -> Result<&str> {
        let crumb = self
            .crumb
            .get_or_try_init(|| self.fetch_crumb(symbol))
            .await?;
        Ok(crumb.as_str())
    }

    async fn fetch_crumb(&self, symbol: &str) -> Result<String> {
        // only the Set-Cookie matters here, the status is usually 404
        match self.client.get(self.cookie_url.clone()).send().await {
            Ok(response) => debug!("Cookie endpoint answered {}", response.status()),
            Err(e) => debug!("Cookie endpoint unreachable: {}", e),
        }

        let mut url = self.quote_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AnalysisError::provider(symbol, format!("base URL {} cannot hold a path", self.quote_base_url)))?
            .pop_if_empty()
            .extend(["v1", "test", "getcrumb"]);

        let (status, body) = self.fetch_body(symbol, url).await?;
        let crumb = body.trim();
        if !status.is_success() || crumb.is_empty() || crumb.contains('<') {
            return Err(AnalysisError::provider(
                symbol,
                format!("crumb request failed with status {}", status),
            ));
        }

        debug!("Obtained quoteSummary crumb");
        Ok(crumb.to_string())
    }

    /// Single attempt; any transport failure is reported against `symbol`.
    async fn fetch_body(&self, symbol: &str, url: Url) -> Result<(StatusCode, String)> {
        self.rate_limiter.wait().await;

        debug!("Making request to: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::provider(symbol, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::provider(symbol, e))?;

        debug!("API response received: {} bytes (status {})", body.len(), status);
        Ok((status, body))
    }
}

/// Decodes a provider body, preferring the provider's own error message over
/// the bare HTTP status when both are present.
fn decode<T, F>(symbol: &str, status: StatusCode, body: &str, error_of: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Option<&ProviderErrorBody>,
{
    let parsed = serde_json::from_str::<T>(body);

    if let Ok(response) = &parsed {
        if let Some(err) = error_of(response) {
            return Err(AnalysisError::provider(symbol, err));
        }
    }

    if !status.is_success() {
        return Err(AnalysisError::provider(
            symbol,
            format!("API request failed with status {}", status),
        ));
    }

    parsed.map_err(|e| AnalysisError::provider(symbol, format!("malformed response: {}", e)))
}

fn series_from_chart(symbol: &str, response: ChartResponse) -> Result<PriceSeries> {
    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AnalysisError::provider(symbol, "empty chart result"))?;

    let offset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let cell = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(PriceBar {
                date,
                open: cell(&quote.open, i),
                high: cell(&quote.high, i),
                low: cell(&quote.low, i),
                close: cell(&quote.close, i),
                adj_close: cell(&adjclose, i),
                volume: cell(&quote.volume, i).map(|v| v as u64),
            })
        })
        .collect();

    Ok(PriceSeries::new(symbol, bars))
}

fn metrics_from_summary(symbol: &str, response: QuoteSummaryResponse) -> Result<QuoteMetrics> {
    let result = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AnalysisError::provider(symbol, "empty quoteSummary result"))?;

    Ok(QuoteMetrics {
        symbol: symbol.to_string(),
        pe_ratio: result
            .summary_detail
            .and_then(|d| d.trailing_pe)
            .and_then(|v| v.raw),
        peg_ratio: result
            .key_statistics
            .and_then(|s| s.peg_ratio)
            .and_then(|v| v.raw),
    })
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooClient {
    /// Get daily price history for a symbol
    async fn get_price_history(&self, symbol: &str, range: DateRange) -> Result<PriceSeries> {
        let url = self.chart_url(symbol, range)?;
        let (status, body) = self.fetch_body(symbol, url).await?;
        let response: ChartResponse = decode(symbol, status, &body, |r: &ChartResponse| r.chart.error.as_ref())?;
        let series = series_from_chart(symbol, response)?;

        debug!("Retrieved {} price bars for {} from {} to {}",
               series.len(), symbol, range.start, range.end);
        Ok(series)
    }

    /// Get trailing P/E and PEG for a symbol
    async fn get_quote_metrics(&self, symbol: &str) -> Result<QuoteMetrics> {
        let crumb = self.crumb(symbol).await?;
        let url = self.quote_summary_url(symbol, crumb)?;
        let (status, body) = self.fetch_body(symbol, url).await?;
        let response: QuoteSummaryResponse =
            decode(symbol, status, &body, |r: &QuoteSummaryResponse| r.quote_summary.error.as_ref())?;
        metrics_from_summary(symbol, response)
    }
}
