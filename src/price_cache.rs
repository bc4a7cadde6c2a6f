//! Local per-ticker CSV price files (`<dir>/<TICKER>.csv`).
//!
//! Files use the `Date,Open,High,Low,Close,Adj Close,Volume` layout; dates may
//! carry a time and offset suffix.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::models::{PriceBar, PriceSeries};

#[derive(Debug, Clone)]
pub struct PriceCache {
    dir: PathBuf,
}

impl PriceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker))
    }

    /// Load the cached history for `ticker`.
    ///
    /// A missing file, or one without any rows, is `MissingLocalData`.
    pub fn load(&self, ticker: &str) -> Result<PriceSeries> {
        let path = self.path_for(ticker);
        let missing = || AnalysisError::MissingLocalData {
            symbol: ticker.to_string(),
            path: path.clone(),
        };

        if !path.is_file() {
            return Err(missing());
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let bars = reader
            .deserialize::<PriceBar>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if bars.is_empty() {
            return Err(missing());
        }

        debug!("Loaded {} cached bars for {} from {}", bars.len(), ticker, path.display());
        Ok(PriceSeries::new(ticker, bars))
    }

    /// Write `series` to the cache under `ticker`, replacing any existing file.
    pub fn store(&self, ticker: &str, series: &PriceSeries) -> Result<usize> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(ticker);
        let mut writer = csv::Writer::from_path(&path)?;
        for bar in series.bars() {
            writer.serialize(bar)?;
        }
        writer.flush()?;

        info!("💾 Saved {} bars for {} to {}", series.len(), ticker, path.display());
        Ok(series.len())
    }
}
