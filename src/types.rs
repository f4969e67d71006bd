use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the target the reference price must sit on for a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// YES bets: reference price above the target.
    Above,
    /// NO bets: reference price below the target.
    #[default]
    Below,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Above => write!(f, "ABOVE"),
            Direction::Below => write!(f, "BELOW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetType {
    Yes,
    No,
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Yes => write!(f, "YES"),
            BetType::No => write!(f, "NO"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetQuality {
    Perfect,
    Good,
    #[default]
    None,
}

impl BetQuality {
    /// Only `PERFECT` and `GOOD` markets are worth an alert.
    pub fn is_actionable(self) -> bool {
        matches!(self, BetQuality::Perfect | BetQuality::Good)
    }
}

impl fmt::Display for BetQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetQuality::Perfect => write!(f, "PERFECT"),
            BetQuality::Good => write!(f, "GOOD"),
            BetQuality::None => write!(f, "NONE"),
        }
    }
}

/// Lifecycle of a market within one scan.
///
/// Every market starts `Pending`. Analysis either leaves it there (market
/// already closed), marks it `PriceFetchFailed`, or replaces it with one of
/// the classifier outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Signal {
    #[default]
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PRICE FETCH FAILED")]
    PriceFetchFailed,
    #[serde(rename = "PERFECT YES")]
    PerfectYes,
    #[serde(rename = "STRONG YES")]
    StrongYes,
    #[serde(rename = "PERFECT NO")]
    PerfectNo,
    #[serde(rename = "STRONG NO")]
    StrongNo,
    #[serde(rename = "NO BET")]
    NoBet,
    #[serde(rename = "AVOID")]
    Avoid,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Pending => "PENDING",
            Signal::PriceFetchFailed => "PRICE FETCH FAILED",
            Signal::PerfectYes => "PERFECT YES",
            Signal::StrongYes => "STRONG YES",
            Signal::PerfectNo => "PERFECT NO",
            Signal::StrongNo => "STRONG NO",
            Signal::NoBet => "NO BET",
            Signal::Avoid => "AVOID",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A daily "$ASSET above $X on <date>" market scraped from the listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Market {
    pub asset: String,
    pub target_price: f64,
    pub closing_time_utc: DateTime<Utc>,
    /// Implied probability shown on the listing, in percent.
    pub probability: f64,
    pub current_price: Option<f64>,
    pub price_diff_percent: Option<f64>,
    pub signal: Signal,
    pub bet_type: Option<BetType>,
    pub edge_score: u32,
    pub bet_quality: BetQuality,
}

impl Market {
    /// A freshly scraped market, not yet priced or classified.
    pub fn pending(
        asset: impl Into<String>,
        target_price: f64,
        closing_time_utc: DateTime<Utc>,
        probability: f64,
    ) -> Self {
        Self {
            asset: asset.into(),
            target_price,
            closing_time_utc,
            probability,
            current_price: None,
            price_diff_percent: None,
            signal: Signal::Pending,
            bet_type: None,
            edge_score: 0,
            bet_quality: BetQuality::None,
        }
    }

    /// Identity of the market across scans.
    pub fn key(&self) -> String {
        format!(
            "{}@{}@{}",
            self.asset,
            self.target_price,
            self.closing_time_utc.to_rfc3339()
        )
    }

    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.closing_time_utc < now
    }

    pub fn apply(&mut self, class: &Classification) {
        self.price_diff_percent = Some(class.price_diff_percent);
        self.signal = class.signal;
        self.bet_type = class.bet_type;
        self.edge_score = class.edge_score;
        self.bet_quality = class.bet_quality;
    }
}

/// Result of scoring one price against one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub signal: Signal,
    pub bet_type: Option<BetType>,
    pub price_diff_percent: f64,
    pub edge_score: u32,
    pub bet_quality: BetQuality,
}

/// A market selected for notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub market: Market,
    /// Whole minutes until close (truncated).
    pub minutes_left: i64,
}

/// What happened to one alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    DryRun,
    /// No bot token or chat id.
    Unconfigured,
    /// Telegram rejected or couldn't be reached; retried next scan.
    Failed,
}

/// One alert, emitted as a JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEvent {
    pub timestamp: String,
    pub market: Market,
    pub minutes_left: i64,
    pub delivery: Delivery,
}

/// End-of-scan summary.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub timestamp: String,
    pub markets: usize,
    pub perfect: usize,
    pub good: usize,
    pub price_failures: usize,
    pub alerts_sent: usize,
    pub next_scan: Option<String>,
}
