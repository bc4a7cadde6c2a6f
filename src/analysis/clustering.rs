//! Hierarchical clustering of tickers by daily price movement.

use chrono::NaiveDate;
use ndarray::Array2;
use tracing::{debug, info, warn};

use super::preprocessing::{clean, standardize};
use crate::api::MarketDataProvider;
use crate::data_collector::DataCollector;
use crate::error::{AnalysisError, Result};
use crate::models::{ClusterAssignment, ClusterConfig, DateRange, Linkage, PriceBar, PriceTable};

/// Retrieve, clean and cluster `config.tickers` over the `lookback_days`
/// ending `today`.
///
/// `Ok(None)` means retrieval failed or left no shared trading day; the
/// reason has already been logged.
pub async fn cluster_movements<P: MarketDataProvider>(
    collector: &DataCollector<P>,
    config: &ClusterConfig,
    today: NaiveDate,
) -> Result<Option<ClusterAssignment>> {
    if config.tickers.is_empty() {
        return Err(AnalysisError::invalid("at least one ticker is required"));
    }
    validate_cluster_count(config.clusters, config.tickers.len())?;

    let range = DateRange::trailing(today, config.lookback_days);
    range.validate()?;

    let Some(table) = clean(collector.retrieve(&config.tickers, range).await) else {
        warn!("⚠️ No data retrieved, skipping clustering");
        return Ok(None);
    };
    if table.is_empty() {
        warn!("⚠️ No complete trading days shared by all tickers, skipping clustering");
        return Ok(None);
    }

    cluster_stocks(&table, config.clusters, config.linkage).map(Some)
}

/// Cluster the tickers of a cleaned table by their standardized Close - Open
/// movement.
pub fn cluster_stocks(table: &PriceTable, clusters: usize, linkage: Linkage) -> Result<ClusterAssignment> {
    let tickers = table.tickers();
    validate_cluster_count(clusters, tickers.len())?;

    if table.is_empty() {
        return Err(AnalysisError::invalid(
            "no complete trading days shared by all tickers",
        ));
    }

    let movements = table.field_matrix("daily movement", PriceBar::movement)?;
    let scaled = standardize(&movements);

    info!("🔗 Clustering {} tickers over {} trading days into {} clusters ({} linkage)",
          tickers.len(), table.len(), clusters, linkage);

    let labels = agglomerative(&scaled, clusters, linkage)?;
    Ok(ClusterAssignment::new(tickers, labels, clusters))
}

fn validate_cluster_count(clusters: usize, tickers: usize) -> Result<()> {
    if clusters == 0 {
        return Err(AnalysisError::invalid("number of clusters must be positive"));
    }
    if clusters > tickers {
        return Err(AnalysisError::invalid(format!(
            "cannot form {} clusters from {} tickers",
            clusters, tickers
        )));
    }
    Ok(())
}

/// Bottom-up clustering of the rows of `data` into exactly `clusters` groups.
///
/// Distances are Euclidean; merged-cluster distances follow the Lance-Williams
/// update for `linkage`. Ties merge the lowest-index pair first. Labels are
/// numbered by first appearance in row order.
pub fn agglomerative(data: &Array2<f64>, clusters: usize, linkage: Linkage) -> Result<Vec<usize>> {
    let n = data.nrows();
    validate_cluster_count(clusters, n)?;

    let mut dist = pairwise_distances(data);
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    // parent[i] is the surviving cluster i was merged into
    let mut parent: Vec<usize> = (0..n).collect();

    for _ in 0..(n - clusters) {
        let Some((a, b)) = closest_pair(&dist, &active) else {
            break;
        };
        let d_ab = dist[[a, b]];
        debug!("Merging clusters {} and {} at distance {:.4}", a, b, d_ab);

        for m in (0..n).filter(|&m| active[m] && m != a && m != b) {
            let updated = lance_williams(
                linkage,
                dist[[m, a]],
                dist[[m, b]],
                d_ab,
                size[a] as f64,
                size[b] as f64,
                size[m] as f64,
            );
            dist[[m, a]] = updated;
            dist[[a, m]] = updated;
        }

        size[a] += size[b];
        active[b] = false;
        parent[b] = a;
    }

    let mut root_label: Vec<Option<usize>> = vec![None; n];
    let mut next_label = 0;
    let labels = (0..n)
        .map(|i| {
            let mut root = i;
            while parent[root] != root {
                root = parent[root];
            }
            *root_label[root].get_or_insert_with(|| {
                next_label += 1;
                next_label - 1
            })
        })
        .collect();

    Ok(labels)
}

fn pairwise_distances(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let mut dist = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (&data.row(i) - &data.row(j)).mapv(|v| v * v).sum().sqrt();
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    dist
}

fn closest_pair(dist: &Array2<f64>, active: &[bool]) -> Option<(usize, usize)> {
    let n = active.len();
    let mut best: Option<(usize, usize, f64)> = None;

    for i in (0..n).filter(|&i| active[i]) {
        for j in ((i + 1)..n).filter(|&j| active[j]) {
            let d = dist[[i, j]];
            if best.map_or(true, |(_, _, current)| d < current) {
                best = Some((i, j, d));
            }
        }
    }

    best.map(|(i, j, _)| (i, j))
}

/// Distance from cluster `m` to the union of `a` and `b`.
fn lance_williams(linkage: Linkage, d_ma: f64, d_mb: f64, d_ab: f64, n_a: f64, n_b: f64, n_m: f64) -> f64 {
    match linkage {
        Linkage::Ward => {
            let total = n_a + n_b + n_m;
            let squared = ((n_m + n_a) * d_ma * d_ma + (n_m + n_b) * d_mb * d_mb - n_m * d_ab * d_ab) / total;
            squared.max(0.0).sqrt()
        }
        Linkage::Average => (n_a * d_ma + n_b * d_mb) / (n_a + n_b),
        Linkage::Complete => d_ma.max(d_mb),
        Linkage::Single => d_ma.min(d_mb),
    }
}
