// Momentum and valuation screening models

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Thresholds for the trend template screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningCriteria {
    /// Leaders are tickers whose Score reaches this quantile of all Scores.
    pub score_quantile: f64,
    pub short_sma_window: usize,
    pub long_sma_window: usize,
    /// Trailing rows used for the 52-week range (52 weeks x 5 trading days).
    pub range_window: usize,
    pub min_low_multiple: f64,
    pub min_high_fraction: f64,
    pub max_pe_ratio: f64,
    pub max_peg_ratio: f64,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            score_quantile: 0.7,
            short_sma_window: 150,
            long_sma_window: 200,
            range_window: 52 * 5,
            min_low_multiple: 1.3,
            min_high_fraction: 0.75,
            max_pe_ratio: 40.0,
            max_peg_ratio: 2.0,
        }
    }
}

/// Settings for a screening run
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Calendar days of history used for the trailing return.
    pub lookback_days: i64,
    /// Stop collecting returns once this many tickers have one.
    pub limit: Option<usize>,
    pub criteria: ScreeningCriteria,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            lookback_days: 365,
            limit: None,
            criteria: ScreeningCriteria::default(),
        }
    }
}

impl ScreeningCriteria {
    /// Checks each of the five conditions independently.
    pub fn evaluate(&self, snapshot: &TechnicalSnapshot, pe_ratio: f64, peg_ratio: f64) -> ConditionReport {
        let price = snapshot.latest_price;

        ConditionReport {
            above_moving_averages: price > snapshot.sma_short && snapshot.sma_short > snapshot.sma_long,
            above_52_week_low: price >= self.min_low_multiple * snapshot.low_52w,
            near_52_week_high: price >= self.min_high_fraction * snapshot.high_52w,
            pe_below_limit: pe_ratio < self.max_pe_ratio,
            peg_below_limit: peg_ratio < self.max_peg_ratio,
        }
    }
}

/// Outcome of each screening condition for one ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionReport {
    pub above_moving_averages: bool,
    pub above_52_week_low: bool,
    pub near_52_week_high: bool,
    pub pe_below_limit: bool,
    pub peg_below_limit: bool,
}

impl ConditionReport {
    pub fn passes(&self) -> bool {
        self.above_moving_averages
            && self.above_52_week_low
            && self.near_52_week_high
            && self.pe_below_limit
            && self.peg_below_limit
    }

    /// Names of the conditions that did not hold
    pub fn failures(&self) -> Vec<&'static str> {
        [
            (self.above_moving_averages, "price > SMA150 > SMA200"),
            (self.above_52_week_low, "price >= 1.3 x 52-week low"),
            (self.near_52_week_high, "price >= 0.75 x 52-week high"),
            (self.pe_below_limit, "P/E below limit"),
            (self.peg_below_limit, "PEG below limit"),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, name)| name)
        .collect()
    }
}

/// Trend figures computed from a ticker's cached history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicalSnapshot {
    pub latest_price: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub low_52w: f64,
    pub high_52w: f64,
}

/// Trailing return of a ticker and its percentile Score in the universe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumScore {
    pub ticker: String,
    pub return_ratio: f64,
    pub score: f64,
}

/// A ticker that passed every screening condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRecord {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Latest_Price")]
    pub latest_price: f64,
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "PE_Ratio")]
    pub pe_ratio: f64,
    #[serde(rename = "PEG_Ratio")]
    pub peg_ratio: f64,
    #[serde(rename = "SMA_150")]
    pub sma_150: f64,
    #[serde(rename = "SMA_200")]
    pub sma_200: f64,
    #[serde(rename = "52_Week_Low")]
    pub low_52w: f64,
    #[serde(rename = "52_Week_High")]
    pub high_52w: f64,
}

/// A ticker dropped from the screen and the reason
#[derive(Debug)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub enum SkipReason {
    Error(AnalysisError),
    BelowScoreCutoff,
    FailedConditions(Vec<&'static str>),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Error(e) => write!(f, "{}", e),
            SkipReason::BelowScoreCutoff => f.write_str("score below cutoff"),
            SkipReason::FailedConditions(names) => write!(f, "failed: {}", names.join(", ")),
        }
    }
}

/// Result of a screening run: passing records sorted by Score descending,
/// plus every ticker that dropped out along the way.
#[derive(Debug, Default)]
pub struct ScreenOutcome {
    pub records: Vec<ScreenRecord>,
    pub skipped: Vec<SkippedTicker>,
}

impl ScreenOutcome {
    pub fn errors(&self) -> impl Iterator<Item = &SkippedTicker> {
        self.skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Error(_)))
    }
}
