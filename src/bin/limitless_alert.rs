use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use limitless_alert::api::{self, PriceBook};
use limitless_alert::config::{AppConfig, CONFIG_PATH};
use limitless_alert::engine::{analyze_markets, open_assets, select_alerts};
use limitless_alert::notifier::Notifier;
use limitless_alert::parser::extract_markets;
use limitless_alert::reporter;
use limitless_alert::state::{ScanState, dispatch, summarize};
use limitless_alert::types::{Delivery, ScanEvent};

#[derive(Parser)]
#[command(
    name = "limitless-alert",
    about = "Scan Limitless daily markets and alert on price-distance signals"
)]
struct Args {
    /// Config file (defaults apply if the default path is missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single scan and exit
    #[arg(long)]
    once: bool,

    /// Minutes between scans (overrides config)
    #[arg(long)]
    interval_mins: Option<u64>,

    /// Parse a saved listing page instead of fetching it
    #[arg(long)]
    html_file: Option<PathBuf>,

    /// Log alerts without sending them
    #[arg(long)]
    dry_run: bool,
}

/// Everything a scan needs that doesn't change between scans.
struct Scanner {
    config: AppConfig,
    client: reqwest::Client,
    notifier: Notifier,
    html_file: Option<PathBuf>,
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!("Failed to load .env: {e}");
        }
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(Path::new(CONFIG_PATH))?,
    };
    config.apply_env();
    if let Some(mins) = args.interval_mins {
        config.scan.interval_minutes = mins;
    }
    config.validate()?;

    let client = api::build_client(config.scan.request_timeout_secs)?;
    let notifier = Notifier::from_config(client.clone(), &config.telegram);
    let interval_secs = config
        .scan
        .interval_minutes
        .checked_mul(60)
        .context("scan interval overflows")?;
    let interval = Duration::from_secs(interval_secs);

    let mode = if args.dry_run { "dry-run" } else { "live" };
    info!(
        "Starting limitless-alert ({mode}) — rule: {} by {}-{}%, window={}min, interval={}min, alerts to {}",
        config.rule.direction,
        config.rule.min_distance_percent,
        config.rule.perfect_distance_percent,
        config.alerts.window_minutes,
        config.scan.interval_minutes,
        notifier.destination(),
    );

    let scanner = Scanner {
        config,
        client,
        notifier,
        html_file: args.html_file,
        dry_run: args.dry_run,
    };
    let mut state = ScanState::new();

    if args.once {
        scanner.scan(&mut state, None).await?;
        return Ok(());
    }

    info!("Entering scan loop. Press Ctrl+C to stop.");
    loop {
        if let Err(e) = scanner.scan(&mut state, Some(interval)).await {
            warn!("Scan error: {e:#}");
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(
        "Stopped after {} scan(s), {} alert(s) sent, {} market(s) still tracked",
        state.total_scans,
        state.total_alerts_sent,
        state.alerted_count()
    );
    Ok(())
}

impl Scanner {
    /// One scan: fetch listing → extract → price → classify → alert → summary.
    async fn scan(&self, state: &mut ScanState, interval: Option<Duration>) -> Result<()> {
        let now = Utc::now();
        state.prune(now);

        info!("Fetching markets...");
        let html = match &self.html_file {
            Some(path) => api::read_listing_file(path)?,
            None => api::fetch_listing_html(&self.client, &self.config.scan.listing_url).await?,
        };
        let mut markets = extract_markets(&html, now);
        info!("Found {} markets", markets.len());

        let mut book = PriceBook::new(
            &self.client,
            &self.config.scan.price_api_base,
            &self.config.scan.symbols,
        );
        for asset in open_assets(&markets, now) {
            book.price(&asset).await;
        }
        analyze_markets(&mut markets, &book.known(), &self.config.rule, now);

        let window = self.config.alerts.window_minutes;
        info!("Checking for markets closing in the next {window} minutes...");
        let alerts = select_alerts(&markets, now, window);
        let attempted = dispatch(state, &self.notifier, alerts, self.dry_run).await;
        let mut alerts_sent = 0;
        for (alert, delivery) in attempted {
            if delivery == Delivery::Sent {
                alerts_sent += 1;
            }
            reporter::report_event(&ScanEvent {
                timestamp: now.to_rfc3339(),
                market: alert.market,
                minutes_left: alert.minutes_left,
                delivery,
            });
        }

        state.total_scans += 1;
        let summary = summarize(
            &markets,
            alerts_sent,
            now,
            interval.and_then(|i| chrono::Duration::from_std(i).ok()),
        );
        reporter::report_summary(&summary);
        info!(
            "Scan complete: {} markets, {} perfect, {} good, {} alert(s) sent",
            summary.markets, summary.perfect, summary.good, summary.alerts_sent
        );
        Ok(())
    }
}
