use std::io::{BufRead, Write};

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::error::{AnalysisError, Result};
use crate::models::ClusterConfig;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `stock_trends=info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_trends=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    // a second install (e.g. from tests) keeps the first subscriber
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Print `message` and read one trimmed line.
pub fn prompt_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> std::io::Result<String> {
    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Split on whitespace and commas, dropping blanks.
pub fn parse_ticker_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A blank answer keeps `default`; anything else must be a positive integer.
pub fn parse_cluster_count(input: &str, default: usize) -> Result<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }

    match trimmed.parse::<usize>() {
        Ok(0) => Err(AnalysisError::invalid("number of clusters must be positive")),
        Ok(count) => Ok(count),
        Err(_) => Err(AnalysisError::invalid(format!(
            "number of clusters must be a positive integer, got '{}'",
            trimmed
        ))),
    }
}

/// Ask for the tickers and/or the cluster count, keeping `config`'s values
/// for blank answers.
pub fn prompt_cluster_config<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    mut config: ClusterConfig,
    ask_tickers: bool,
    ask_clusters: bool,
) -> anyhow::Result<ClusterConfig> {
    if ask_tickers {
        let answer = prompt_line(
            input,
            output,
            &format!(
                "Enter stock tickers separated by spaces (default: {}): ",
                config.tickers.join(" ")
            ),
        )?;
        let tickers = parse_ticker_list(&answer);
        if !tickers.is_empty() {
            config.tickers = tickers;
        }
    }

    if ask_clusters {
        let answer = prompt_line(
            input,
            output,
            &format!("Enter the number of clusters (default: {}): ", config.clusters),
        )?;
        config.clusters = parse_cluster_count(&answer, config.clusters)?;
    }

    Ok(config)
}
