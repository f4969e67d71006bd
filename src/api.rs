use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, warn};

/// Assets with a known USDT spot pair on Binance.
const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("BTC", "BTCUSDT"),
    ("ETH", "ETHUSDT"),
    ("BNB", "BNBUSDT"),
    ("SOL", "SOLUSDT"),
    ("XRP", "XRPUSDT"),
    ("ADA", "ADAUSDT"),
    ("AVAX", "AVAXUSDT"),
    ("DOGE", "DOGEUSDT"),
    ("LINK", "LINKUSDT"),
    ("TRX", "TRXUSDT"),
    ("LTC", "LTCUSDT"),
    ("BCH", "BCHUSDT"),
    ("XLM", "XLMUSDT"),
    ("HBAR", "HBARUSDT"),
    ("SUI", "SUIUSDT"),
    ("PAXG", "PAXGUSDT"),
];

/// Build the shared HTTP client with the configured request timeout.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("limitless-alert/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Fetch the raw HTML of the market listing page.
pub async fn fetch_listing_html(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned {status}");
    }
    let body = resp.text().await.context("failed to read listing body")?;
    debug!("Fetched listing ({} bytes)", body.len());
    Ok(body)
}

/// Read a saved listing page from disk.
pub fn read_listing_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Resolve the exchange symbol for an asset, config overrides first.
pub fn symbol_for(asset: &str, overrides: &HashMap<String, String>) -> Option<String> {
    if let Some(symbol) = overrides.get(asset) {
        return Some(symbol.clone());
    }
    DEFAULT_SYMBOLS
        .iter()
        .find(|(a, _)| *a == asset)
        .map(|(_, s)| s.to_string())
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Fetch the latest spot price for a symbol (`GET /api/v3/ticker/price`).
pub async fn fetch_reference_price(
    client: &reqwest::Client,
    base: &str,
    symbol: &str,
) -> Result<f64> {
    let url = format!("{}/api/v3/ticker/price", base.trim_end_matches('/'));
    let resp = client
        .get(&url)
        .query(&[("symbol", symbol)])
        .send()
        .await
        .with_context(|| format!("price request for {symbol} failed"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("price request for {symbol} returned {status}");
    }
    let ticker: TickerPrice = resp
        .json()
        .await
        .with_context(|| format!("invalid ticker response for {symbol}"))?;
    let price: f64 = ticker
        .price
        .parse()
        .with_context(|| format!("invalid price {:?} for {symbol}", ticker.price))?;
    if !price.is_finite() || price <= 0.0 {
        bail!("non-positive price {price} for {symbol}");
    }
    Ok(price)
}

/// Per-scan price cache: each asset is looked up at most once.
///
/// Failures (unknown asset, HTTP or parse errors) are cached as misses.
pub struct PriceBook<'a> {
    client: &'a reqwest::Client,
    base: &'a str,
    overrides: &'a HashMap<String, String>,
    cache: HashMap<String, Option<f64>>,
}

impl<'a> PriceBook<'a> {
    pub fn new(
        client: &'a reqwest::Client,
        base: &'a str,
        overrides: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            client,
            base,
            overrides,
            cache: HashMap::new(),
        }
    }

    pub async fn price(&mut self, asset: &str) -> Option<f64> {
        if let Some(cached) = self.cache.get(asset) {
            return *cached;
        }
        let price = match symbol_for(asset, self.overrides) {
            Some(symbol) => match fetch_reference_price(self.client, self.base, &symbol).await {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Price fetch failed for {asset}: {e:#}");
                    None
                }
            },
            None => {
                warn!("No exchange symbol for {asset}");
                None
            }
        };
        self.cache.insert(asset.to_string(), price);
        price
    }

    /// Resolved prices so far, misses excluded.
    pub fn known(&self) -> HashMap<String, f64> {
        self.cache
            .iter()
            .filter_map(|(asset, p)| p.map(|p| (asset.clone(), p)))
            .collect()
    }
}
