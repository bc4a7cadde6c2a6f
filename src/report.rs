//! Plain-text and JSON rendering of analysis results.

use std::fmt::Write;

use crate::models::{ClusterAssignment, ScreenOutcome, ScreenRecord};

pub const CLUSTER_HEADER: &str =
    "Stocks in each cluster (Clustered based on daily movements of stock prices):";

/// Header line followed by `Cluster <id+1>: T1, T2` for every cluster id.
pub fn render_clusters(assignment: &ClusterAssignment) -> String {
    let mut out = String::from(CLUSTER_HEADER);
    out.push('\n');
    for (id, members) in assignment.groups().iter().enumerate() {
        let _ = writeln!(out, "Cluster {}: {}", id + 1, members.join(", "));
    }
    out
}

/// Fixed-width table in the order given (callers pass Score-sorted records).
pub fn render_screen_table(records: &[ScreenRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:>12} {:>6} {:>9} {:>9} {:>10} {:>10} {:>12} {:>12}",
        "Ticker", "Latest_Price", "Score", "PE_Ratio", "PEG_Ratio", "SMA_150", "SMA_200", "52_Week_Low", "52_Week_High"
    );

    for r in records {
        let _ = writeln!(
            out,
            "{:<14} {:>12.2} {:>6.0} {:>9.2} {:>9.2} {:>10.2} {:>10.2} {:>12.2} {:>12.2}",
            r.ticker, r.latest_price, r.score, r.pe_ratio, r.peg_ratio, r.sma_150, r.sma_200, r.low_52w, r.high_52w
        );
    }
    out
}

/// Table plus a summary of skipped tickers.
pub fn render_screen_outcome(outcome: &ScreenOutcome) -> String {
    let mut out = if outcome.records.is_empty() {
        String::from("No tickers passed the screen.\n")
    } else {
        render_screen_table(&outcome.records)
    };

    let errors = outcome.errors().count();
    let _ = writeln!(
        out,
        "\n{} passed, {} skipped ({} with errors)",
        outcome.records.len(),
        outcome.skipped.len(),
        errors
    );
    out
}

/// Records as a JSON array using the table's column names.
pub fn screen_records_json(records: &[ScreenRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
