// Momentum and valuation screening engine
// Ranks a universe by trailing return, then applies the trend template and
// valuation limits to the leaders.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::indicators::{
    cumulative_return, percentile_rank, quantile, round_to, trailing_max, trailing_min, trailing_sma,
};
use crate::api::MarketDataProvider;
use crate::error::{AnalysisError, Result};
use crate::models::screening::SkipReason;
use crate::models::{
    DateRange, MomentumScore, PriceSeries, ScreenConfig, ScreenOutcome, ScreenRecord, ScreeningCriteria,
    SkippedTicker, TechnicalSnapshot,
};
use crate::price_cache::PriceCache;

pub struct Screener<P> {
    provider: P,
    cache: PriceCache,
    symbol_suffix: String,
    config: ScreenConfig,
}

impl<P: MarketDataProvider> Screener<P> {
    pub fn new(provider: P, cache: PriceCache, symbol_suffix: impl Into<String>, config: ScreenConfig) -> Self {
        Self {
            provider,
            cache,
            symbol_suffix: symbol_suffix.into(),
            config,
        }
    }

    fn provider_symbol(&self, ticker: &str) -> String {
        format!("{}{}", ticker, self.symbol_suffix)
    }

    /// Run the full screen over `universe` as of `today`.
    ///
    /// Tickers are handled one at a time; a failing ticker is recorded in
    /// `skipped` and the run continues.
    pub async fn screen(&self, universe: &[String], today: NaiveDate) -> ScreenOutcome {
        let mut outcome = ScreenOutcome::default();
        let range = DateRange::trailing(today, self.config.lookback_days);

        info!("🔍 Screening {} tickers ({} to {})", universe.len(), range.start, range.end);

        let returns = self.collect_returns(universe, range, &mut outcome.skipped).await;
        let scores = rank_momentum(returns);
        let (leaders, laggards) = select_leaders(scores, self.config.criteria.score_quantile);

        info!("📈 {} of {} ranked tickers reach the score cutoff", leaders.len(), leaders.len() + laggards.len());
        outcome.skipped.extend(laggards.into_iter().map(|m| SkippedTicker {
            ticker: m.ticker,
            reason: SkipReason::BelowScoreCutoff,
        }));

        for leader in leaders {
            match self.evaluate_leader(&leader).await {
                Ok(Ok(record)) => {
                    info!("✅ {} passed all conditions (score {})", record.ticker, record.score);
                    outcome.records.push(record);
                }
                Ok(Err(failures)) => {
                    debug!("⚪ {} failed: {}", leader.ticker, failures.join(", "));
                    outcome.skipped.push(SkippedTicker {
                        ticker: leader.ticker,
                        reason: SkipReason::FailedConditions(failures),
                    });
                }
                Err(e) => {
                    warn!("❌ Error analyzing data for {}: {}", leader.ticker, e);
                    outcome.skipped.push(SkippedTicker {
                        ticker: leader.ticker,
                        reason: SkipReason::Error(e),
                    });
                }
            }
        }

        sort_by_score(&mut outcome.records);
        info!("🎯 {} tickers passed the screen", outcome.records.len());
        outcome
    }

    /// Trailing return (rounded to 2 decimals) for each ticker that has one.
    async fn collect_returns(
        &self,
        universe: &[String],
        range: DateRange,
        skipped: &mut Vec<SkippedTicker>,
    ) -> Vec<(String, f64)> {
        let mut returns = Vec::new();

        for ticker in universe {
            if self.config.limit.map_or(false, |limit| returns.len() >= limit) {
                info!("🔢 Limiting to {} tickers", returns.len());
                break;
            }

            match self.trailing_return(ticker, range).await {
                Ok(value) => {
                    debug!("{}: trailing return {:.2}", ticker, value);
                    returns.push((ticker.clone(), value));
                }
                Err(e) => {
                    warn!("❌ Error fetching data for {}: {}", ticker, e);
                    skipped.push(SkippedTicker {
                        ticker: ticker.clone(),
                        reason: SkipReason::Error(e),
                    });
                }
            }
        }

        returns
    }

    async fn trailing_return(&self, ticker: &str, range: DateRange) -> Result<f64> {
        let series = self
            .provider
            .get_price_history(&self.provider_symbol(ticker), range)
            .await?;

        if series.is_empty() {
            return Err(AnalysisError::missing_metric(ticker, "price history"));
        }

        cumulative_return(&series.adj_closes())
            .map(|growth| round_to(growth, 2))
            .ok_or_else(|| AnalysisError::missing_metric(ticker, "trailing return"))
    }

    /// `Ok(Err(..))` carries the names of the conditions that failed.
    async fn evaluate_leader(&self, leader: &MomentumScore) -> Result<std::result::Result<ScreenRecord, Vec<&'static str>>> {
        let ticker = leader.ticker.as_str();
        let criteria = &self.config.criteria;

        let series = self.cache.load(ticker)?;
        let snapshot = technical_snapshot(series, criteria)?;

        let metrics = self.provider.get_quote_metrics(&self.provider_symbol(ticker)).await?;
        let pe_ratio = metrics
            .pe_ratio
            .ok_or_else(|| AnalysisError::missing_metric(ticker, "P/E ratio"))?;
        let peg_ratio = metrics
            .peg_ratio
            .ok_or_else(|| AnalysisError::missing_metric(ticker, "PEG ratio"))?;

        let report = criteria.evaluate(&snapshot, pe_ratio, peg_ratio);
        if !report.passes() {
            return Ok(Err(report.failures()));
        }

        Ok(Ok(ScreenRecord {
            ticker: leader.ticker.clone(),
            latest_price: snapshot.latest_price,
            score: leader.score.round_ties_even(),
            pe_ratio,
            peg_ratio,
            sma_150: snapshot.sma_short,
            sma_200: snapshot.sma_long,
            low_52w: snapshot.low_52w,
            high_52w: snapshot.high_52w,
        }))
    }
}

/// Attach percentile Scores to trailing returns, keeping each return paired
/// with its own ticker.
pub fn rank_momentum(returns: Vec<(String, f64)>) -> Vec<MomentumScore> {
    let values: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();
    let scores = percentile_rank(&values);

    returns
        .into_iter()
        .zip(scores)
        .map(|((ticker, return_ratio), score)| MomentumScore {
            ticker,
            return_ratio,
            score,
        })
        .collect()
}

/// Split into (leaders, rest) at the `q` quantile of the Scores.
pub fn select_leaders(scores: Vec<MomentumScore>, q: f64) -> (Vec<MomentumScore>, Vec<MomentumScore>) {
    let values: Vec<f64> = scores.iter().map(|m| m.score).collect();
    let Some(cutoff) = quantile(&values, q) else {
        return (Vec::new(), scores);
    };

    scores.into_iter().partition(|m| m.score >= cutoff)
}

/// Trend figures from cached history; incomplete rows are dropped first.
///
/// The 52-week range spans the last `range_window` rows, a trading-day
/// approximation that ignores the holiday calendar.
pub fn technical_snapshot(series: PriceSeries, criteria: &ScreeningCriteria) -> Result<TechnicalSnapshot> {
    let symbol = series.symbol.clone();
    let series = series.drop_incomplete();

    let closes = series.adj_closes();
    let lows: Vec<f64> = series.bars().iter().filter_map(|b| b.low).collect();
    let highs: Vec<f64> = series.bars().iter().filter_map(|b| b.high).collect();

    let latest_price = *closes
        .last()
        .ok_or_else(|| AnalysisError::missing_metric(&symbol, "latest price"))?;
    let sma_short = trailing_sma(&closes, criteria.short_sma_window)
        .ok_or_else(|| AnalysisError::missing_metric(&symbol, format!("SMA {}", criteria.short_sma_window)))?;
    let sma_long = trailing_sma(&closes, criteria.long_sma_window)
        .ok_or_else(|| AnalysisError::missing_metric(&symbol, format!("SMA {}", criteria.long_sma_window)))?;
    let low_52w = trailing_min(&lows, criteria.range_window)
        .ok_or_else(|| AnalysisError::missing_metric(&symbol, "52-week low"))?;
    let high_52w = trailing_max(&highs, criteria.range_window)
        .ok_or_else(|| AnalysisError::missing_metric(&symbol, "52-week high"))?;

    Ok(TechnicalSnapshot {
        latest_price,
        sma_short: round_to(sma_short, 2),
        sma_long: round_to(sma_long, 2),
        low_52w: round_to(low_52w, 2),
        high_52w: round_to(high_52w, 2),
    })
}

/// Highest Score first; equal Scores keep their screening order.
pub fn sort_by_score(records: &mut [ScreenRecord]) {
    records.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}
