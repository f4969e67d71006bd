use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::notifier::Notifier;
use crate::types::{Alert, BetQuality, Delivery, Market, ScanSummary, Signal};

/// State carried between scans of a long-running process.
#[derive(Debug, Default)]
pub struct ScanState {
    /// Markets already alerted on, keyed by `Market::key`, with their close time.
    alerted: HashMap<String, DateTime<Utc>>,
    pub total_scans: u64,
    pub total_alerts_sent: u64,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_alert(&self, market: &Market) -> bool {
        !self.alerted.contains_key(&market.key())
    }

    pub fn mark_alerted(&mut self, market: &Market) {
        self.alerted.insert(market.key(), market.closing_time_utc);
    }

    /// Apply a delivery outcome. Everything but `Failed` marks the market
    /// handled; only `Sent` counts toward the totals.
    pub fn record(&mut self, market: &Market, delivery: Delivery) {
        match delivery {
            Delivery::Sent => {
                self.total_alerts_sent += 1;
                self.mark_alerted(market);
            }
            Delivery::DryRun | Delivery::Unconfigured => self.mark_alerted(market),
            Delivery::Failed => {}
        }
    }

    /// Forget markets that have closed; they can't be listed again.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.alerted.retain(|_, closes| *closes >= now);
    }

    pub fn alerted_count(&self) -> usize {
        self.alerted.len()
    }
}

/// Deliver every alert not yet handled and record the outcome.
///
/// Returns the alerts that were attempted, in order, with their outcome.
/// Dry runs never touch the network.
pub async fn dispatch(
    state: &mut ScanState,
    notifier: &Notifier,
    alerts: Vec<Alert>,
    dry_run: bool,
) -> Vec<(Alert, Delivery)> {
    let mut attempted = Vec::new();
    for alert in alerts {
        let market = &alert.market;
        if !state.should_alert(market) {
            continue;
        }
        info!(
            "ALERT: {} closes in {}min — {} | score {}/100",
            market.asset, alert.minutes_left, market.signal, market.edge_score
        );

        let delivery = if dry_run {
            Delivery::DryRun
        } else {
            match notifier.send_alert(market, alert.minutes_left).await {
                Ok(true) => {
                    info!("Telegram alert sent");
                    Delivery::Sent
                }
                Ok(false) => Delivery::Unconfigured,
                Err(e) => {
                    warn!("Failed to send alert for {}: {e:#}", market.asset);
                    Delivery::Failed
                }
            }
        };
        state.record(market, delivery);
        attempted.push((alert, delivery));
    }
    attempted
}

/// Summarize one scan. `interval` is `None` for a single-shot run.
pub fn summarize(
    markets: &[Market],
    alerts_sent: usize,
    now: DateTime<Utc>,
    interval: Option<Duration>,
) -> ScanSummary {
    let count = |quality: BetQuality| markets.iter().filter(|m| m.bet_quality == quality).count();
    ScanSummary {
        timestamp: now.to_rfc3339(),
        markets: markets.len(),
        perfect: count(BetQuality::Perfect),
        good: count(BetQuality::Good),
        price_failures: markets
            .iter()
            .filter(|m| m.signal == Signal::PriceFetchFailed)
            .count(),
        alerts_sent,
        next_scan: interval.map(|i| (now + i).to_rfc3339()),
    }
}
