use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::types::Direction;
use crate::{LISTING_URL, PRICE_API_BASE, TELEGRAM_API_BASE};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Longest allowed gap between scans (one week).
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// HTTP timeout when no config overrides it.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub rule: RuleConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api_base(),
        }
    }
}

/// Distance rule used to classify markets.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RuleConfig {
    /// Minimum distance from target (percent) for a bet at all.
    #[serde(default = "default_min_distance")]
    pub min_distance_percent: f64,
    /// Distance (percent) at which a bet scores 100.
    #[serde(default = "default_perfect_distance")]
    pub perfect_distance_percent: f64,
    #[serde(default)]
    pub direction: Direction,
}

fn default_min_distance() -> f64 {
    4.0
}

fn default_perfect_distance() -> f64 {
    10.0
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_distance_percent: default_min_distance(),
            perfect_distance_percent: default_perfect_distance(),
            direction: Direction::default(),
        }
    }
}

/// Alert timing.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Only alert on markets closing within this many minutes.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
}

fn default_window_minutes() -> u32 {
    65
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
        }
    }
}

/// Scraping and price source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    #[serde(default = "default_price_api_base")]
    pub price_api_base: String,
    /// Minutes between scans in loop mode.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Extra or replacement asset → exchange symbol mappings.
    #[serde(default)]
    pub symbols: HashMap<String, String>,
}

fn default_listing_url() -> String {
    LISTING_URL.to_string()
}

fn default_price_api_base() -> String {
    PRICE_API_BASE.to_string()
}

fn default_interval_minutes() -> u64 {
    120
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            price_api_base: default_price_api_base(),
            interval_minutes: default_interval_minutes(),
            request_timeout_secs: default_request_timeout(),
            symbols: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    /// Override Telegram credentials from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
        );
    }

    fn apply_overrides(&mut self, token: Option<String>, chat_id: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = chat_id.filter(|c| !c.trim().is_empty()) {
            self.telegram.chat_id = chat_id;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let rule = &self.rule;
        if !(rule.min_distance_percent > 0.0) {
            bail!("rule.min_distance_percent must be positive");
        }
        if !(rule.perfect_distance_percent > rule.min_distance_percent) {
            bail!(
                "rule.perfect_distance_percent ({}) must exceed rule.min_distance_percent ({})",
                rule.perfect_distance_percent,
                rule.min_distance_percent
            );
        }
        if self.alerts.window_minutes == 0 {
            bail!("alerts.window_minutes must be positive");
        }
        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.scan.interval_minutes) {
            bail!(
                "scan.interval_minutes must be between 1 and {MAX_INTERVAL_MINUTES}, got {}",
                self.scan.interval_minutes
            );
        }
        if self.scan.request_timeout_secs == 0 {
            bail!("scan.request_timeout_secs must be positive");
        }
        Ok(())
    }
}
