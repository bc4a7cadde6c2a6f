use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by data retrieval, the local price cache and the analyses.
///
/// Only `InvalidInput` is meant to abort a run; every other variant marks a
/// single ticker (or a single batch) as skipped.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to fetch data for {symbol}: {reason}")]
    ProviderFetch { symbol: String, reason: String },

    #[error("no local price data for {symbol} at {}", path.display())]
    MissingLocalData { symbol: String, path: PathBuf },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{metric} unavailable for {symbol}")]
    MissingMetric { symbol: String, metric: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AnalysisError {
    pub fn provider(symbol: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AnalysisError::ProviderFetch {
            symbol: symbol.into(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_metric(symbol: impl Into<String>, metric: impl Into<String>) -> Self {
        AnalysisError::MissingMetric {
            symbol: symbol.into(),
            metric: metric.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AnalysisError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
