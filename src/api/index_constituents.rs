//! Index constituent lists published as CSV (e.g. the NSE Nifty 50 list).

use reqwest::Client;
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::models::Config;

const SOURCE: &str = "index constituents";

/// Download the constituent list at `config.universe_url` and return its
/// bare ticker symbols.
pub async fn fetch_constituents(config: &Config) -> Result<Vec<String>> {
    info!("🌐 Fetching index constituents from {}", config.universe_url);

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| AnalysisError::provider(SOURCE, e))?;

    let response = client
        .get(&config.universe_url)
        .send()
        .await
        .map_err(|e| AnalysisError::provider(SOURCE, e))?;

    if !response.status().is_success() {
        return Err(AnalysisError::provider(
            SOURCE,
            format!("request failed with status {}", response.status()),
        ));
    }

    let csv_text = response
        .text()
        .await
        .map_err(|e| AnalysisError::provider(SOURCE, e))?;

    let symbols = parse_constituents_csv(&csv_text)?;
    info!("✅ Parsed {} index constituents", symbols.len());
    Ok(symbols)
}

/// Reads the `Symbol` column (any case), falling back to the first column.
/// Blank and repeated symbols are dropped; order is kept.
pub fn parse_constituents_csv(csv_text: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("symbol"))
        .unwrap_or(0);

    let mut symbols: Vec<String> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let symbol = record.get(column).unwrap_or("").trim();
        if !symbol.is_empty() && !symbols.iter().any(|s| s == symbol) {
            symbols.push(symbol.to_string());
        }
    }

    if symbols.is_empty() {
        return Err(AnalysisError::provider(SOURCE, "constituent list is empty"));
    }

    Ok(symbols)
}
