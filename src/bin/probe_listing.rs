//! Probe: Limitless listing extraction
//!
//! Fetches the daily listing page (or reads a saved copy) and prints every
//! market the extraction pattern finds, without pricing or alerting.
//! Use it to check the pattern still matches after a site change.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use limitless_alert::api;
use limitless_alert::config::{AppConfig, CONFIG_PATH};
use limitless_alert::parser::extract_markets;

#[derive(Parser)]
#[command(name = "probe_listing", about = "Print markets extracted from the listing page")]
struct Cli {
    /// Config file for listing URL and request timeout
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listing URL to fetch (overrides config)
    #[arg(long)]
    url: Option<String>,

    /// Read a saved page instead of fetching
    #[arg(long)]
    html_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(Path::new(CONFIG_PATH))?,
    };
    let url = cli.url.as_deref().unwrap_or(&config.scan.listing_url);

    println!("=== Probe: Limitless listing ===");
    let start = Instant::now();
    let html = match &cli.html_file {
        Some(path) => {
            println!("Source: {}", path.display());
            api::read_listing_file(path)?
        }
        None => {
            println!("Source: {url}");
            let client = api::build_client(config.scan.request_timeout_secs)?;
            api::fetch_listing_html(&client, url).await?
        }
    };
    println!("Loaded {} bytes in {:?}", html.len(), start.elapsed());
    println!();

    let now = Utc::now();
    let markets = extract_markets(&html, now);
    println!("Markets found: {}", markets.len());
    if markets.is_empty() {
        println!("(no matches — page may be rendered client-side)");
        return Ok(());
    }
    println!();

    println!(
        "{:<6} {:>14} {:>20} {:>8} {:>8}",
        "Asset", "Target ($)", "Closes (UTC)", "Prob%", "Open"
    );
    println!("{}", "-".repeat(60));
    for m in &markets {
        println!(
            "{:<6} {:>14.4} {:>20} {:>8.1} {:>8}",
            m.asset,
            m.target_price,
            m.closing_time_utc.format("%Y-%m-%d %H:%M"),
            m.probability,
            if m.is_closed(now) { "no" } else { "yes" },
        );
    }

    Ok(())
}
