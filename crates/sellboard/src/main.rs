//! sellboard - Marketplace seller dashboard

mod cli;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use cli::GroupBy;
use indicatif::{ProgressBar, ProgressStyle};
use sellboard_core::aggregation::DateRange;
use sellboard_core::models::ResourceKey;
use sellboard_core::{CoreError, DataStore, HttpGateway, SellboardConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sellboard",
    version,
    about = "Marketplace seller dashboard",
    long_about = "Collects shop data from the seller API through a proxy and prints\n\
                  dashboard figures: stats, finance summaries and expense breakdowns.\n\
                  \n\
                  Examples:\n\
                    sellboard stats                      # Dashboard summary\n\
                    sellboard finance --days 7           # Revenue and profit, last 7 days\n\
                    sellboard expenses --by code         # Expenses grouped by code\n\
                    sellboard fetch orders --json        # Raw order records\n\
                    sellboard fetch orders --param status=CREATED\n\
                  \n\
                  Environment Variables:\n\
                    SELLBOARD_TOKEN                      # API token (sent verbatim)\n\
                    SELLBOARD_SHOP_ID                    # Selected shop\n\
                    SELLBOARD_PROXY_URL                  # Proxy endpoint\n\
                    SELLBOARD_CONFIG                     # Config file path\n\
                    RUST_LOG                             # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Seller API token, forwarded as the Authorization header
    #[arg(long, env = "SELLBOARD_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Shop to query
    #[arg(long, env = "SELLBOARD_SHOP_ID", global = true)]
    shop_id: Option<i64>,

    /// Proxy endpoint (overrides the config file)
    #[arg(long, env = "SELLBOARD_PROXY_URL", global = true)]
    proxy_url: Option<String>,

    /// Config file (default: <config dir>/sellboard/config.toml)
    #[arg(long, env = "SELLBOARD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh and print dashboard stats
    Stats {
        /// Ignore the cache and refetch everything
        #[arg(long)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Revenue, profit and expenses for a period
    Finance {
        /// Period length in days, ending now
        #[arg(long, short = 'd', default_value = "30")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Expenses grouped by source or code
    Expenses {
        /// Period length in days, ending now
        #[arg(long, short = 'd', default_value = "30")]
        days: u32,
        /// Grouping key
        #[arg(long, value_enum, default_value_t = GroupBy::Source)]
        by: GroupBy,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Collect one resource (shops, products, orders, financeOrders, ...)
    Fetch {
        resource: ResourceKey,
        /// Extra query parameter, repeatable; filtered results skip the cache
        #[arg(long = "param", value_name = "NAME=VALUE", value_parser = cli::parse_param)]
        params: Vec<(String, String)>,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = build_store(&cli)?;

    match cli.command {
        Command::Stats { force, json } => run_stats(&store, force, json).await,
        Command::Finance { days, json } => run_finance(&store, days, json).await,
        Command::Expenses { days, by, json } => run_expenses(&store, days, by, json).await,
        Command::Fetch {
            resource,
            params,
            json,
        } => run_fetch(&store, resource, &params, json).await,
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sellboard=debug,sellboard_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_store(cli: &Cli) -> Result<DataStore<HttpGateway>> {
    let mut config = match &cli.config {
        Some(path) => SellboardConfig::load(path)?,
        None => SellboardConfig::load_default()?,
    };
    if let Some(url) = &cli.proxy_url {
        config.proxy_url = url.clone();
    }
    config.validate()?;

    let token = cli
        .token
        .clone()
        .context("No API token: pass --token or set SELLBOARD_TOKEN")?;

    let gateway = HttpGateway::new(config.proxy_url.clone(), config.request_timeout())?
        .with_body_policy(config.body_policy);

    let store = DataStore::new(gateway, config.store_config());
    store.login(token, cli.shop_id);
    Ok(store)
}

fn spinner(message: &str, json: bool) -> Option<ProgressBar> {
    if json {
        return None;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());
    Some(spinner)
}

/// Clear the spinner and print what the user can do about `error`
fn report_failure(spinner: Option<&ProgressBar>, source: &str, error: &CoreError) {
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    if let Some(hint) = cli::failure_hint(source, error) {
        eprintln!("{}", hint);
    }
}

fn finish(spinner: Option<ProgressBar>, start: Instant) {
    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!("✓ Done in {:.2}s", start.elapsed().as_secs_f64()));
    }
}

async fn run_stats(store: &DataStore<HttpGateway>, force: bool, json: bool) -> Result<()> {
    let start = Instant::now();
    let progress = spinner("Loading products, orders, finance and stock...", json);

    let result = store.refresh_stats(force).await;
    if let Err(error) = &result {
        report_failure(progress.as_ref(), "stats", error);
    }
    let (stats, report) = result.context("Failed to refresh stats")?;
    finish(progress, start);

    if json {
        println!("{}", serde_json::to_string_pretty(&*stats)?);
        return Ok(());
    }

    println!("{}", cli::format_stats(&stats));

    if report.served_from_cache {
        println!();
        println!("(served from cache)");
    }
    if report.has_errors() {
        eprintln!();
        eprintln!("Warnings:");
        for warning in report.warnings() {
            eprintln!("  - {}: {}", warning.source, warning.message);
        }
    }

    Ok(())
}

async fn run_finance(store: &DataStore<HttpGateway>, days: u32, json: bool) -> Result<()> {
    let start = Instant::now();
    let range = DateRange::last_days(days, Utc::now());
    let progress = spinner("Loading finance orders and expenses...", json);

    let summary = store.financial_summary(range).await;
    if let Err(error) = &summary {
        report_failure(progress.as_ref(), "finance", error);
    }
    let summary = summary.context("Failed to load finance data")?;
    finish(progress, start);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", cli::format_financial_summary(&summary, &range));
    }
    Ok(())
}

async fn run_expenses(
    store: &DataStore<HttpGateway>,
    days: u32,
    by: GroupBy,
    json: bool,
) -> Result<()> {
    let start = Instant::now();
    let range = DateRange::last_days(days, Utc::now());
    let progress = spinner("Loading expenses...", json);

    let summary = store.financial_summary(range).await;
    if let Err(error) = &summary {
        report_failure(progress.as_ref(), "expenses", error);
    }
    let summary = summary.context("Failed to load expenses")?;
    finish(progress, start);

    println!("{}", cli::format_expenses(&summary.expenses, by, json));
    Ok(())
}

async fn run_fetch(
    store: &DataStore<HttpGateway>,
    key: ResourceKey,
    params: &[(String, String)],
    json: bool,
) -> Result<()> {
    if !key.is_collection() {
        bail!("'{}' is computed locally; use `sellboard stats`", key);
    }

    let start = Instant::now();
    let progress = spinner(&format!("Collecting {}...", key), json);

    let records = if params.is_empty() {
        store.refetch(key).await
    } else {
        store.collect_filtered(key, params).await.map(Arc::new)
    };
    if let Err(error) = &records {
        report_failure(progress.as_ref(), key.as_str(), error);
    }
    let records = records.with_context(|| format!("Failed to collect {}", key))?;
    finish(progress, start);

    if json {
        println!("{}", serde_json::to_string_pretty(&*records)?);
    } else {
        println!("{}: {} records", key, records.len());
    }
    Ok(())
}
