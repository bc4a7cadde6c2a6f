use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Linkage criterion for agglomerative clustering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    #[default]
    Ward,
    Average,
    Complete,
    Single,
}

impl FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ward" => Ok(Linkage::Ward),
            "average" => Ok(Linkage::Average),
            "complete" => Ok(Linkage::Complete),
            "single" => Ok(Linkage::Single),
            other => Err(format!(
                "unknown linkage '{}' (expected ward, average, complete or single)",
                other
            )),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Linkage::Ward => "ward",
            Linkage::Average => "average",
            Linkage::Complete => "complete",
            Linkage::Single => "single",
        };
        f.write_str(name)
    }
}

/// Tickers used when none are given on the command line or at the prompt.
pub const DEFAULT_TICKERS: [&str; 9] = ["AAPL", "NVDA", "TSLA", "ABBV", "MCD", "CCL", "MSFT", "GS", "JPM"];

/// Settings for a clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub tickers: Vec<String>,
    pub clusters: usize,
    /// Calendar days of history ending today.
    pub lookback_days: i64,
    pub linkage: Linkage,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            clusters: 5,
            lookback_days: 730,
            linkage: Linkage::Ward,
        }
    }
}

/// Ticker to cluster id mapping, in the order the tickers were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    labels: Vec<(String, usize)>,
    num_clusters: usize,
}

impl ClusterAssignment {
    pub fn new(tickers: &[String], labels: Vec<usize>, num_clusters: usize) -> Self {
        Self {
            labels: tickers.iter().cloned().zip(labels).collect(),
            num_clusters,
        }
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn labels(&self) -> &[(String, usize)] {
        &self.labels
    }

    pub fn cluster_of(&self, ticker: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, id)| *id)
    }

    /// Members of `cluster_id` in request order
    pub fn members(&self, cluster_id: usize) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, id)| *id == cluster_id)
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Members of every cluster id in `0..num_clusters`.
    pub fn groups(&self) -> Vec<Vec<&str>> {
        (0..self.num_clusters).map(|id| self.members(id)).collect()
    }
}
