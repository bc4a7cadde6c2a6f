use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use ndarray::Array2;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AnalysisError, Result};

pub mod clustering;
pub mod screening;

pub use clustering::{ClusterAssignment, ClusterConfig, Linkage};
pub use screening::{
    ConditionReport, MomentumScore, ScreenConfig, ScreenOutcome, ScreenRecord, ScreeningCriteria,
    SkippedTicker, TechnicalSnapshot,
};

/// One daily bar. Field names follow the CSV layout of the local price cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(rename = "Date", deserialize_with = "deserialize_bar_date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: Option<f64>,
    #[serde(rename = "High")]
    pub high: Option<f64>,
    #[serde(rename = "Low")]
    pub low: Option<f64>,
    #[serde(rename = "Close")]
    pub close: Option<f64>,
    #[serde(rename = "Adj Close")]
    pub adj_close: Option<f64>,
    #[serde(rename = "Volume")]
    pub volume: Option<u64>,
}

impl PriceBar {
    /// True when every tracked price field is present and finite.
    /// Volume is not a tracked field.
    pub fn is_complete(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.adj_close]
            .iter()
            .all(|v| v.map_or(false, f64::is_finite))
    }

    /// Intraday movement, Close - Open.
    pub fn movement(&self) -> Option<f64> {
        Some(self.close? - self.open?)
    }
}

/// Cached files may carry a time and offset after the date
/// (`2024-01-02 00:00:00+05:30`); only the date part is kept.
fn deserialize_bar_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.trim().get(..10).unwrap_or(raw.trim());
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

/// Daily bars for one ticker, strictly increasing by date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts the bars by date and drops duplicate dates, keeping the last bar
    /// seen for a date.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);

        let mut unique: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => unique.push(bar),
            }
        }

        Self {
            symbol: symbol.into(),
            bars: unique,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Keeps only complete bars, order preserved.
    pub fn drop_incomplete(self) -> Self {
        Self {
            symbol: self.symbol,
            bars: self.bars.into_iter().filter(PriceBar::is_complete).collect(),
        }
    }

    /// Adjusted closes of the bars that have one.
    pub fn adj_closes(&self) -> Vec<f64> {
        self.bars.iter().filter_map(|bar| bar.adj_close).collect()
    }
}

/// A date row of a [`PriceTable`]; `bars[i]` belongs to the table's i-th ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub bars: Vec<Option<PriceBar>>,
}

impl PriceRow {
    pub fn is_complete(&self) -> bool {
        self.bars
            .iter()
            .all(|bar| bar.as_ref().map_or(false, PriceBar::is_complete))
    }
}

/// Daily bars for several tickers, outer-joined on date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    tickers: Vec<String>,
    rows: Vec<PriceRow>,
}

impl PriceTable {
    pub fn from_series(series: Vec<PriceSeries>) -> Self {
        let width = series.len();
        let mut by_date: BTreeMap<NaiveDate, Vec<Option<PriceBar>>> = BTreeMap::new();
        let mut tickers = Vec::with_capacity(width);

        for (column, s) in series.into_iter().enumerate() {
            tickers.push(s.symbol);
            for bar in s.bars {
                let date = bar.date;
                by_date.entry(date).or_insert_with(|| vec![None; width])[column] = Some(bar);
            }
        }

        let rows = by_date
            .into_iter()
            .map(|(date, bars)| PriceRow { date, bars })
            .collect();

        Self { tickers, rows }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.date).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drops every row where any ticker is missing a bar or a tracked field.
    pub fn drop_incomplete(self) -> Self {
        Self {
            tickers: self.tickers,
            rows: self.rows.into_iter().filter(PriceRow::is_complete).collect(),
        }
    }

    /// Tickers x dates matrix of `field`. Fails on the first missing cell, so
    /// callers are expected to clean the table first.
    pub fn field_matrix<F>(&self, field_name: &str, field: F) -> Result<Array2<f64>>
    where
        F: Fn(&PriceBar) -> Option<f64>,
    {
        let mut matrix = Array2::zeros((self.tickers.len(), self.rows.len()));

        for (t, row) in self.rows.iter().enumerate() {
            for (i, bar) in row.bars.iter().enumerate() {
                matrix[[i, t]] = bar.as_ref().and_then(&field).ok_or_else(|| {
                    AnalysisError::missing_metric(
                        self.tickers[i].clone(),
                        format!("{} on {}", field_name, row.date),
                    )
                })?;
            }
        }

        Ok(matrix)
    }
}

/// Fundamentals used by the screener.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteMetrics {
    pub symbol: String,
    pub pe_ratio: Option<f64>,
    pub peg_ratio: Option<f64>,
}

/// Half-open date range `[start, end)` for history requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` calendar days before `end`.
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(AnalysisError::invalid(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn days_count(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub chart_base_url: String,
    pub quote_base_url: String,
    /// Visited once per client to obtain the session cookie for the crumb
    pub cookie_url: String,
    pub universe_url: String,
    pub symbol_suffix: String,
    pub cache_dir: String,
    pub request_timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chart_base_url: "https://query1.finance.yahoo.com".to_string(),
            quote_base_url: "https://query2.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
            universe_url: "https://archives.nseindia.com/content/indices/ind_nifty50list.csv"
                .to_string(),
            symbol_suffix: ".NS".to_string(),
            cache_dir: "stock_data".to_string(),
            request_timeout_secs: 30,
            rate_limit_per_minute: 120,
            user_agent: "stock-trends/0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Config::default();

        Ok(Config {
            chart_base_url: std::env::var("YAHOO_CHART_BASE_URL")
                .unwrap_or(defaults.chart_base_url),
            quote_base_url: std::env::var("YAHOO_QUOTE_BASE_URL")
                .unwrap_or(defaults.quote_base_url),
            cookie_url: std::env::var("YAHOO_COOKIE_URL").unwrap_or(defaults.cookie_url),
            universe_url: std::env::var("UNIVERSE_URL").unwrap_or(defaults.universe_url),
            symbol_suffix: std::env::var("SYMBOL_SUFFIX").unwrap_or(defaults.symbol_suffix),
            cache_dir: std::env::var("STOCK_CACHE_DIR").unwrap_or(defaults.cache_dir),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_per_minute),
            user_agent: std::env::var("HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
        })
    }

    /// Provider symbol for a bare universe ticker, e.g. `TCS` -> `TCS.NS`.
    pub fn provider_symbol(&self, ticker: &str) -> String {
        format!("{}{}", ticker, self.symbol_suffix)
    }
}
