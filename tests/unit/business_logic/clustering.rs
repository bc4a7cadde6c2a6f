//! Movement clustering tests

use std::collections::HashSet;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::test_data::{day, series_from_moves};
use stock_trends::analysis::{clean, cluster_stocks};
use stock_trends::error::AnalysisError;
use stock_trends::models::{Linkage, PriceSeries, PriceTable};

fn scenario_a() -> PriceTable {
    PriceTable::from_series(vec![
        series_from_moves("AAA", &[1.0, -1.0, 2.0, -2.0, 1.0, 0.5]),
        series_from_moves("BBB", &[1.1, -0.9, 2.1, -1.9, 0.9, 0.6]),
        series_from_moves("CCC", &[-2.0, 2.0, -1.0, 3.0, -2.0, -1.0]),
    ])
}

#[test]
fn test_near_identical_movers_share_a_cluster() {
    let table = clean(Some(scenario_a())).unwrap();
    let assignment = cluster_stocks(&table, 2, Linkage::Ward).unwrap();

    assert_eq!(assignment.cluster_of("AAA"), assignment.cluster_of("BBB"));
    assert_ne!(assignment.cluster_of("AAA"), assignment.cluster_of("CCC"));
    assert_eq!(assignment.groups(), vec![vec!["AAA", "BBB"], vec!["CCC"]]);
}

#[test]
fn test_every_ticker_gets_one_of_k_ids() {
    let table = clean(Some(scenario_a())).unwrap();

    for k in 1..=3 {
        let assignment = cluster_stocks(&table, k, Linkage::Average).unwrap();
        let tickers: Vec<&str> = assignment.labels().iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "BBB", "CCC"]);

        let ids: HashSet<usize> = assignment.labels().iter().map(|(_, id)| *id).collect();
        assert_eq!(ids.len(), k);
        assert!(ids.iter().all(|&id| id < k));
    }
}

#[test]
fn test_clean_keeps_only_fully_populated_days_in_order() {
    let full = series_from_moves("AAA", &[1.0, 2.0, 3.0, 4.0]);
    let gappy = series_from_moves("BBB", &[1.0, 2.0, 3.0, 4.0]);
    let mut bars: Vec<_> = gappy.bars().to_vec();
    bars.remove(1);
    bars[1].adj_close = None;
    let gappy = PriceSeries::new("BBB", bars);

    let table = PriceTable::from_series(vec![full, gappy]);
    assert_eq!(table.len(), 4);

    let cleaned = clean(Some(table)).unwrap();
    assert_eq!(cleaned.dates(), vec![day(0), day(3)]);
    assert!(cleaned.rows().iter().all(|row| row.is_complete()));
}

#[test]
fn test_no_shared_trading_days_is_invalid_input() {
    let table = PriceTable::from_series(vec![
        PriceSeries::new("AAA", series_from_moves("AAA", &[1.0]).bars().to_vec()),
        PriceSeries::new(
            "BBB",
            vec![crate::common::test_data::create_test_bar(day(5), 100.0, 101.0)],
        ),
    ]);
    let cleaned = clean(Some(table)).unwrap();

    assert_matches!(
        cluster_stocks(&cleaned, 1, Linkage::Ward),
        Err(AnalysisError::InvalidInput(ref msg)) if msg.contains("no complete trading days")
    );
}

#[test]
fn test_constant_day_does_not_break_clustering() {
    // day 2 moves identically for every ticker
    let table = PriceTable::from_series(vec![
        series_from_moves("AAA", &[1.0, -1.0, 0.0]),
        series_from_moves("BBB", &[1.2, -0.8, 0.0]),
        series_from_moves("CCC", &[-3.0, 2.5, 0.0]),
    ]);

    let assignment = cluster_stocks(&table, 2, Linkage::Complete).unwrap();
    assert_eq!(assignment.members(0), vec!["AAA", "BBB"]);
}
