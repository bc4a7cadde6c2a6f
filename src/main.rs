use std::io::{self, IsTerminal};

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use stock_trends::analysis::{cluster_movements, Screener};
use stock_trends::api::{fetch_constituents, YahooClient};
use stock_trends::data_collector::DataCollector;
use stock_trends::models::{ClusterConfig, Config, DateRange, Linkage, ScreenConfig};
use stock_trends::price_cache::PriceCache;
use stock_trends::{report, utils};

/// Stock movement clustering and momentum/valuation screening
#[derive(Parser)]
#[command(name = "stock-trends")]
#[command(version)]
#[command(about = "Cluster stocks by daily movement or screen an index for momentum leaders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Group tickers by the similarity of their daily Close - Open movement
    Cluster {
        /// Tickers to cluster (prompted for when omitted on a terminal)
        #[arg(long, short = 't', num_args = 1.., value_delimiter = ',')]
        tickers: Option<Vec<String>>,

        /// Number of clusters (prompted for when omitted on a terminal)
        #[arg(long, short = 'k')]
        clusters: Option<usize>,

        /// Calendar days of history ending today
        #[arg(long, short = 'd', default_value_t = 730)]
        days: i64,

        /// ward, average, complete or single
        #[arg(long, short = 'l', default_value_t = Linkage::Ward)]
        linkage: Linkage,
    },

    /// Rank an index by trailing return and shortlist the leaders that pass
    /// the trend and valuation rules
    Screen {
        /// Screen these tickers instead of the index constituents
        #[arg(long, short = 't', num_args = 1.., value_delimiter = ',')]
        tickers: Option<Vec<String>>,

        /// Stop after this many tickers have a trailing return
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Directory holding <TICKER>.csv price files
        #[arg(long)]
        cache_dir: Option<String>,

        /// Print the passing records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download daily history for the universe into the local price cache
    SyncCache {
        /// Sync these tickers instead of the index constituents
        #[arg(long, short = 't', num_args = 1.., value_delimiter = ',')]
        tickers: Option<Vec<String>>,

        /// Calendar days of history ending today
        #[arg(long, short = 'd', default_value_t = 730)]
        days: i64,

        /// Directory holding <TICKER>.csv price files
        #[arg(long)]
        cache_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Cluster { tickers, clusters, days, linkage } => {
            run_cluster(&config, tickers, clusters, days, linkage).await
        }
        Command::Screen { tickers, limit, cache_dir, json } => {
            run_screen(&config, tickers, limit, cache_dir, json).await
        }
        Command::SyncCache { tickers, days, cache_dir } => {
            run_sync_cache(&config, tickers, days, cache_dir).await
        }
    }
}

async fn run_cluster(
    config: &Config,
    tickers: Option<Vec<String>>,
    clusters: Option<usize>,
    days: i64,
    linkage: Linkage,
) -> Result<()> {
    let mut cluster_config = ClusterConfig {
        lookback_days: days,
        linkage,
        ..ClusterConfig::default()
    };
    let ask_tickers = tickers.is_none();
    let ask_clusters = clusters.is_none();
    if let Some(tickers) = tickers {
        cluster_config.tickers = tickers;
    }
    if let Some(clusters) = clusters {
        cluster_config.clusters = clusters;
    }

    if (ask_tickers || ask_clusters) && io::stdin().is_terminal() {
        let stdin = io::stdin();
        cluster_config = utils::prompt_cluster_config(
            &mut stdin.lock(),
            &mut io::stdout(),
            cluster_config,
            ask_tickers,
            ask_clusters,
        )?;
    }

    let collector = DataCollector::new(YahooClient::new(config)?);
    let today = Utc::now().date_naive();

    match cluster_movements(&collector, &cluster_config, today).await? {
        Some(assignment) => print!("{}", report::render_clusters(&assignment)),
        None => println!("❌ No data available for clustering"),
    }
    Ok(())
}

async fn run_screen(
    config: &Config,
    tickers: Option<Vec<String>>,
    limit: Option<usize>,
    cache_dir: Option<String>,
    json: bool,
) -> Result<()> {
    let Some(universe) = resolve_universe(config, tickers).await else {
        return Ok(());
    };

    let cache = PriceCache::new(cache_dir.unwrap_or_else(|| config.cache_dir.clone()));
    let screen_config = ScreenConfig {
        limit,
        ..ScreenConfig::default()
    };
    let screener = Screener::new(YahooClient::new(config)?, cache, config.symbol_suffix.as_str(), screen_config);

    let outcome = screener.screen(&universe, Utc::now().date_naive()).await;

    if json {
        println!("{}", report::screen_records_json(&outcome.records)?);
    } else {
        print!("{}", report::render_screen_outcome(&outcome));
    }
    Ok(())
}

async fn run_sync_cache(
    config: &Config,
    tickers: Option<Vec<String>>,
    days: i64,
    cache_dir: Option<String>,
) -> Result<()> {
    let Some(universe) = resolve_universe(config, tickers).await else {
        return Ok(());
    };

    let cache = PriceCache::new(cache_dir.unwrap_or_else(|| config.cache_dir.clone()));
    let collector = DataCollector::new(YahooClient::new(config)?);
    let range = DateRange::trailing(Utc::now().date_naive(), days);

    let result = collector
        .sync_cache(&universe, &config.symbol_suffix, range, &cache)
        .await?;

    println!(
        "✅ Cached {}/{} tickers ({} records) in {}",
        result.stored_stocks,
        result.total_stocks,
        result.total_records,
        cache.dir().display()
    );
    if result.failed_stocks > 0 {
        println!("⚠️  {} tickers failed, see the log for details", result.failed_stocks);
    }
    Ok(())
}

/// Explicit tickers, or the index constituents. `None` when the download
/// failed; the error is logged and the command ends without output.
async fn resolve_universe(config: &Config, tickers: Option<Vec<String>>) -> Option<Vec<String>> {
    if let Some(tickers) = tickers {
        return Some(tickers);
    }

    match fetch_constituents(config).await {
        Ok(symbols) => {
            info!("📋 Universe: {} tickers", symbols.len());
            Some(symbols)
        }
        Err(e) => {
            error!("❌ Could not load the index constituents: {}", e);
            eprintln!("❌ Could not load the index constituents: {}", e);
            None
        }
    }
}
