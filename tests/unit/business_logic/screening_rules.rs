//! Screening rule tests

use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::test_data::{create_rising_series, create_test_bar, day};
use stock_trends::analysis::{rank_momentum, select_leaders, technical_snapshot};
use stock_trends::models::{PriceSeries, ScreeningCriteria, TechnicalSnapshot};

fn snapshot(latest_price: f64, sma_short: f64, sma_long: f64, low_52w: f64, high_52w: f64) -> TechnicalSnapshot {
    TechnicalSnapshot {
        latest_price,
        sma_short,
        sma_long,
        low_52w,
        high_52w,
    }
}

#[test]
fn test_strong_trend_passes_and_expensive_pe_fails() {
    let criteria = ScreeningCriteria::default();
    let s = snapshot(100.0, 90.0, 80.0, 70.0, 120.0);

    assert!(criteria.evaluate(&s, 20.0, 1.0).passes());

    let report = criteria.evaluate(&s, 45.0, 1.0);
    assert!(!report.passes());
    assert_eq!(report.failures(), vec!["P/E below limit"]);
}

#[test]
fn test_each_trend_condition_is_reported() {
    let criteria = ScreeningCriteria::default();

    // SMAs inverted, price too close to the low, far below the high
    let report = criteria.evaluate(&snapshot(100.0, 80.0, 90.0, 80.0, 140.0), 10.0, 3.0);
    assert_eq!(
        report.failures(),
        vec![
            "price > SMA150 > SMA200",
            "price >= 1.3 x 52-week low",
            "price >= 0.75 x 52-week high",
            "PEG below limit",
        ]
    );
}

#[test]
fn test_tied_returns_share_a_score() {
    let returns = vec![
        ("AAA".to_string(), 1.1),
        ("BBB".to_string(), 1.1),
        ("CCC".to_string(), 1.4),
    ];

    let scores = rank_momentum(returns);
    let values: Vec<f64> = scores.iter().map(|m| m.score).collect();
    assert_eq!(values, vec![50.0, 50.0, 100.0]);

    let (leaders, rest) = select_leaders(scores, 0.7);
    assert_eq!(leaders.len(), 1);
    assert_eq!(leaders[0].ticker, "CCC");
    assert_eq!(rest.len(), 2);
}

#[test]
fn test_scores_stay_with_their_ticker() {
    let returns = vec![
        ("HIGH".to_string(), 2.0),
        ("LOW".to_string(), 0.5),
        ("MID".to_string(), 1.0),
    ];

    let scores = rank_momentum(returns);
    let by_name = |name: &str| scores.iter().find(|m| m.ticker == name).map(|m| m.score);

    let close = |actual: Option<f64>, expected: f64| actual.map_or(false, |v| (v - expected).abs() < 1e-9);

    assert_eq!(by_name("HIGH"), Some(100.0));
    assert!(close(by_name("LOW"), 100.0 / 3.0));
    assert!(close(by_name("MID"), 200.0 / 3.0));
}

#[test]
fn test_empty_universe_has_no_leaders() {
    let (leaders, rest) = select_leaders(rank_momentum(Vec::new()), 0.7);
    assert!(leaders.is_empty());
    assert!(rest.is_empty());
}

#[test]
fn test_snapshot_ignores_incomplete_rows() {
    let rising = create_rising_series("GAPS", 250, 100.0, 1.0);
    let mut bars = rising.bars().to_vec();
    // a trailing half-filled row must not become the latest price
    let mut partial = create_test_bar(day(250), 900.0, 900.0);
    partial.low = None;
    bars.push(partial);

    let s = technical_snapshot(PriceSeries::new("GAPS", bars), &ScreeningCriteria::default()).unwrap();
    assert_eq!(s.latest_price, 349.0);
    // 250 rows < 260: the range covers every row
    assert_eq!(s.low_52w, 98.5);
    assert_eq!(s.high_52w, 350.0);
}
