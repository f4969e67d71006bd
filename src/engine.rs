use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::RuleConfig;
use crate::types::{Alert, BetQuality, BetType, Classification, Direction, Market, Signal};

/// Score at the `min_distance_percent` edge; rises linearly to 100 at
/// `perfect_distance_percent`.
const BASE_SCORE: f64 = 60.0;
const SCORE_RANGE: f64 = 40.0;

/// Signed distance of `current` from `target`, in percent of `target`.
pub fn price_diff_percent(current: f64, target: f64) -> f64 {
    (current - target) / target * 100.0
}

fn score(distance: f64, rule: &RuleConfig) -> u32 {
    let span = rule.perfect_distance_percent - rule.min_distance_percent;
    let raw = BASE_SCORE + (distance - rule.min_distance_percent) / span * SCORE_RANGE;
    raw.clamp(0.0, 100.0) as u32
}

fn no_bet(signal: Signal, diff: f64) -> Classification {
    Classification {
        signal,
        bet_type: None,
        price_diff_percent: diff,
        edge_score: 0,
        bet_quality: BetQuality::None,
    }
}

/// Classify one market against the distance rule.
///
/// For `Direction::Below` (NO bets), with `d` the signed distance in percent:
/// `d <= -perfect` is PERFECT, `-perfect < d <= -min` is GOOD,
/// `-min < d < 0` is NO BET, anything at or above the target is AVOID.
/// `Direction::Above` mirrors this for YES bets.
pub fn calculate_signal(current: f64, target: f64, rule: &RuleConfig) -> Classification {
    if !(target > 0.0) || !target.is_finite() || !current.is_finite() {
        return no_bet(Signal::Avoid, 0.0);
    }

    let diff = price_diff_percent(current, target);
    let min = rule.min_distance_percent;
    let perfect = rule.perfect_distance_percent;

    match rule.direction {
        Direction::Above => {
            if diff >= perfect {
                Classification {
                    signal: Signal::PerfectYes,
                    bet_type: Some(BetType::Yes),
                    price_diff_percent: diff,
                    edge_score: 100,
                    bet_quality: BetQuality::Perfect,
                }
            } else if diff >= min {
                Classification {
                    signal: Signal::StrongYes,
                    bet_type: Some(BetType::Yes),
                    price_diff_percent: diff,
                    edge_score: score(diff, rule),
                    bet_quality: BetQuality::Good,
                }
            } else if diff > 0.0 {
                no_bet(Signal::NoBet, diff)
            } else {
                no_bet(Signal::Avoid, diff)
            }
        }
        Direction::Below => {
            if diff <= -perfect {
                Classification {
                    signal: Signal::PerfectNo,
                    bet_type: Some(BetType::No),
                    price_diff_percent: diff,
                    edge_score: 100,
                    bet_quality: BetQuality::Perfect,
                }
            } else if diff <= -min {
                Classification {
                    signal: Signal::StrongNo,
                    bet_type: Some(BetType::No),
                    price_diff_percent: diff,
                    edge_score: score(diff.abs(), rule),
                    bet_quality: BetQuality::Good,
                }
            } else if diff < 0.0 {
                no_bet(Signal::NoBet, diff)
            } else {
                no_bet(Signal::Avoid, diff)
            }
        }
    }
}

/// Distinct assets of markets still open at `now`, in first-seen order.
pub fn open_assets(markets: &[Market], now: DateTime<Utc>) -> Vec<String> {
    let mut assets: Vec<String> = Vec::new();
    for market in markets.iter().filter(|m| !m.is_closed(now)) {
        if !assets.contains(&market.asset) {
            assets.push(market.asset.clone());
        }
    }
    assets
}

/// Price and classify every open market in place.
///
/// Closed markets stay `PENDING`. Open markets without a price in `prices`
/// become `PRICE FETCH FAILED`.
pub fn analyze_markets(
    markets: &mut [Market],
    prices: &HashMap<String, f64>,
    rule: &RuleConfig,
    now: DateTime<Utc>,
) {
    info!(
        "Looking for: price {} target by {}-{}%",
        rule.direction, rule.min_distance_percent, rule.perfect_distance_percent
    );

    for market in markets.iter_mut() {
        if market.is_closed(now) {
            debug!("{} closed at {}, skipping", market.asset, market.closing_time_utc);
            continue;
        }
        let Some(&current) = prices.get(&market.asset) else {
            market.signal = Signal::PriceFetchFailed;
            continue;
        };
        market.current_price = Some(current);
        let class = calculate_signal(current, market.target_price, rule);
        market.apply(&class);
        debug!(
            "{} target={} current={} diff={:+.2}% → {} ({})",
            market.asset,
            market.target_price,
            current,
            class.price_diff_percent,
            class.signal,
            class.edge_score
        );
    }
}

/// Actionable markets closing within `window_minutes` of `now`.
pub fn select_alerts(markets: &[Market], now: DateTime<Utc>, window_minutes: u32) -> Vec<Alert> {
    let window = f64::from(window_minutes);
    markets
        .iter()
        .filter(|m| m.bet_quality.is_actionable())
        .filter_map(|m| {
            let minutes_left = (m.closing_time_utc - now).num_milliseconds() as f64 / 60_000.0;
            (minutes_left > 0.0 && minutes_left <= window).then(|| Alert {
                market: m.clone(),
                minutes_left: minutes_left as i64,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn below() -> RuleConfig {
        RuleConfig::default()
    }

    fn above() -> RuleConfig {
        RuleConfig {
            direction: Direction::Above,
            ..RuleConfig::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn market(asset: &str, target: f64, closes_in_mins: i64) -> Market {
        Market::pending(asset, target, now() + Duration::minutes(closes_in_mins), 50.0)
    }

    // ── price_diff_percent ─────────────────────────────────────────

    #[test]
    fn diff_sign() {
        assert!(approx_eq(price_diff_percent(110.0, 100.0), 10.0));
        assert!(approx_eq(price_diff_percent(90.0, 100.0), -10.0));
        assert!(approx_eq(price_diff_percent(100.0, 100.0), 0.0));
    }

    // ── calculate_signal: Below (NO bets) ──────────────────────────

    #[test]
    fn below_perfect() {
        let c = calculate_signal(85.0, 100.0, &below());
        assert_eq!(c.signal, Signal::PerfectNo);
        assert_eq!(c.bet_type, Some(BetType::No));
        assert_eq!(c.edge_score, 100);
        assert_eq!(c.bet_quality, BetQuality::Perfect);
        assert!(approx_eq(c.price_diff_percent, -15.0));
    }

    #[test]
    fn below_perfect_boundary_inclusive() {
        let c = calculate_signal(90.0, 100.0, &below());
        assert_eq!(c.signal, Signal::PerfectNo);
    }

    #[test]
    fn below_strong_scores_linearly() {
        // 7% below: 60 + (7 - 4) / 6 * 40 = 80
        let c = calculate_signal(93.0, 100.0, &below());
        assert_eq!(c.signal, Signal::StrongNo);
        assert_eq!(c.bet_type, Some(BetType::No));
        assert_eq!(c.bet_quality, BetQuality::Good);
        assert_eq!(c.edge_score, 80);
    }

    #[test]
    fn below_strong_min_boundary_inclusive() {
        let c = calculate_signal(96.0, 100.0, &below());
        assert_eq!(c.signal, Signal::StrongNo);
        assert_eq!(c.edge_score, 60);
    }

    #[test]
    fn below_score_truncates() {
        // 5% below: 60 + 1/6 * 40 = 66.67 → 66
        let c = calculate_signal(95.0, 100.0, &below());
        assert_eq!(c.edge_score, 66);
    }

    #[test]
    fn below_too_close_is_no_bet() {
        let c = calculate_signal(98.0, 100.0, &below());
        assert_eq!(c.signal, Signal::NoBet);
        assert_eq!(c.bet_type, None);
        assert_eq!(c.edge_score, 0);
        assert_eq!(c.bet_quality, BetQuality::None);
        assert!(approx_eq(c.price_diff_percent, -2.0));
    }

    #[test]
    fn below_wrong_side_is_avoid() {
        assert_eq!(calculate_signal(100.0, 100.0, &below()).signal, Signal::Avoid);
        assert_eq!(calculate_signal(120.0, 100.0, &below()).signal, Signal::Avoid);
    }

    // ── calculate_signal: Above (YES bets) ─────────────────────────

    #[test]
    fn above_perfect() {
        let c = calculate_signal(110.0, 100.0, &above());
        assert_eq!(c.signal, Signal::PerfectYes);
        assert_eq!(c.bet_type, Some(BetType::Yes));
        assert_eq!(c.edge_score, 100);
        assert_eq!(c.bet_quality, BetQuality::Perfect);
    }

    #[test]
    fn above_strong() {
        let c = calculate_signal(107.0, 100.0, &above());
        assert_eq!(c.signal, Signal::StrongYes);
        assert_eq!(c.edge_score, 80);
        assert_eq!(c.bet_quality, BetQuality::Good);
    }

    #[test]
    fn above_too_close_and_wrong_side() {
        assert_eq!(calculate_signal(102.0, 100.0, &above()).signal, Signal::NoBet);
        assert_eq!(calculate_signal(100.0, 100.0, &above()).signal, Signal::Avoid);
        assert_eq!(calculate_signal(80.0, 100.0, &above()).signal, Signal::Avoid);
    }

    #[test]
    fn custom_thresholds_rescale_score() {
        let rule = RuleConfig {
            min_distance_percent: 2.0,
            perfect_distance_percent: 6.0,
            direction: Direction::Below,
        };
        // 4% below: 60 + (4 - 2) / 4 * 40 = 80
        let c = calculate_signal(96.0, 100.0, &rule);
        assert_eq!(c.signal, Signal::StrongNo);
        assert_eq!(c.edge_score, 80);
    }

    #[test]
    fn degenerate_target_is_avoid() {
        let c = calculate_signal(10.0, 0.0, &below());
        assert_eq!(c.signal, Signal::Avoid);
        assert!(approx_eq(c.price_diff_percent, 0.0));
        assert_eq!(calculate_signal(f64::NAN, 100.0, &below()).signal, Signal::Avoid);
    }

    // ── analyze_markets ────────────────────────────────────────────

    #[test]
    fn analyze_lifecycle() {
        let mut markets = vec![
            market("BTC", 100.0, 30),
            market("ETH", 100.0, -5),
            market("PEPE", 1.0, 30),
        ];
        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), 92.0);
        prices.insert("ETH".to_string(), 50.0);

        analyze_markets(&mut markets, &prices, &below(), now());

        assert_eq!(markets[0].signal, Signal::StrongNo);
        assert_eq!(markets[0].current_price, Some(92.0));
        assert!(approx_eq(markets[0].price_diff_percent.unwrap(), -8.0));
        assert_eq!(markets[0].edge_score, 86);

        // Closed: untouched even though a price exists
        assert_eq!(markets[1].signal, Signal::Pending);
        assert_eq!(markets[1].current_price, None);

        assert_eq!(markets[2].signal, Signal::PriceFetchFailed);
        assert_eq!(markets[2].current_price, None);
        assert_eq!(markets[2].price_diff_percent, None);
        assert_eq!(markets[2].bet_quality, BetQuality::None);
    }

    #[test]
    fn open_assets_dedups_and_skips_closed() {
        let markets = vec![
            market("BTC", 100.0, 30),
            market("ETH", 100.0, -5),
            market("BTC", 110.0, 90),
            market("SOL", 100.0, 10),
        ];
        assert_eq!(open_assets(&markets, now()), vec!["BTC", "SOL"]);
    }

    // ── select_alerts ──────────────────────────────────────────────

    fn classified(asset: &str, closes_in_mins: i64, quality: BetQuality) -> Market {
        let mut m = market(asset, 100.0, closes_in_mins);
        m.bet_quality = quality;
        m
    }

    #[test]
    fn alerts_only_actionable_in_window() {
        let markets = vec![
            classified("A", 30, BetQuality::Perfect),
            classified("B", 30, BetQuality::Good),
            classified("C", 30, BetQuality::None),
            classified("D", 65, BetQuality::Good),
            classified("E", 66, BetQuality::Good),
            classified("F", 0, BetQuality::Perfect),
            classified("G", -10, BetQuality::Perfect),
        ];
        let alerts = select_alerts(&markets, now(), 65);
        let assets: Vec<&str> = alerts.iter().map(|a| a.market.asset.as_str()).collect();
        assert_eq!(assets, vec!["A", "B", "D"]);
        assert_eq!(alerts[0].minutes_left, 30);
        assert_eq!(alerts[2].minutes_left, 65);
    }

    #[test]
    fn alert_minutes_truncate() {
        let mut m = classified("A", 0, BetQuality::Good);
        m.closing_time_utc = now() + Duration::seconds(59 * 60 + 59);
        let alerts = select_alerts(&[m], now(), 65);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].minutes_left, 59);
    }

    #[test]
    fn listing_to_alerts() {
        let html = concat!(
            "<li>$BTC above $100,000 on Mar 10, 12:45 UTC <b>8%</b></li>",
            "<li>$ETH above $3,000 on Mar 10, 12:30 UTC <b>45%</b></li>",
            "<li>$SOL above $200 on Mar 11, 12:00 UTC <b>3%</b></li>",
            "<li>$WIF above $2.50 on Mar 10, 12:20 UTC <b>1%</b></li>",
        );
        let mut markets = crate::parser::extract_markets(html, now());
        assert_eq!(open_assets(&markets, now()), vec!["BTC", "ETH", "SOL", "WIF"]);

        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), 88_000.0);
        prices.insert("ETH".to_string(), 2_990.0);
        prices.insert("SOL".to_string(), 150.0);
        analyze_markets(&mut markets, &prices, &below(), now());

        assert_eq!(markets[0].signal, Signal::PerfectNo);
        assert_eq!(markets[1].signal, Signal::NoBet);
        assert_eq!(markets[2].signal, Signal::PerfectNo);
        assert_eq!(markets[3].signal, Signal::PriceFetchFailed);

        // SOL is perfect but closes tomorrow
        let alerts = select_alerts(&markets, now(), 65);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].market.asset, "BTC");
        assert_eq!(alerts[0].minutes_left, 45);
    }

    #[test]
    fn unparseable_closing_time_stays_pending() {
        let html = "$BTC above $100,000 on Foo 99, 77:00 UTC <b>40%</b>";
        let mut markets = crate::parser::extract_markets(html, now());
        assert!(open_assets(&markets, now()).is_empty());

        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), 80_000.0);
        analyze_markets(&mut markets, &prices, &below(), now());

        assert_eq!(markets[0].signal, Signal::Pending);
        assert_eq!(markets[0].current_price, None);
        assert_eq!(markets[0].bet_quality, BetQuality::None);
        assert!(select_alerts(&markets, now(), 65).is_empty());
    }

    #[test]
    fn alert_sub_minute_still_selected() {
        let mut m = classified("A", 0, BetQuality::Good);
        m.closing_time_utc = now() + Duration::seconds(20);
        let alerts = select_alerts(&[m], now(), 65);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].minutes_left, 0);
    }
}
