use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use crate::types::Market;

/// `$BTC above $97,500 on Jan 5, 14:00 UTC ... 12.5%`
///
/// Captures: asset, target price (may contain commas), closing time text,
/// implied probability.
static RE_MARKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$([A-Z]{2,5})\s+above\s+\$([\d,]+\.?\d*)\s+on\s+([A-Za-z]+\s+\d+,\s+\d{2}:\d{2}\s+UTC)[^%]*?(\d+\.?\d*)%",
    )
    .unwrap()
});

/// Extract every market listed in the page HTML, in page order.
///
/// Matches whose numbers don't parse are skipped. A market whose closing
/// time doesn't parse is kept but dated one second before `now`, so
/// analysis treats it as closed.
pub fn extract_markets(html: &str, now: DateTime<Utc>) -> Vec<Market> {
    let mut markets = Vec::new();
    for caps in RE_MARKET.captures_iter(html) {
        let asset = &caps[1];
        let target = match caps[2].replace(',', "").parse::<f64>() {
            Ok(v) => v,
            Err(e) => {
                debug!("Skipping {asset}: bad target price {:?}: {e}", &caps[2]);
                continue;
            }
        };
        let probability = match caps[4].parse::<f64>() {
            Ok(v) => v,
            Err(e) => {
                debug!("Skipping {asset}: bad probability {:?}: {e}", &caps[4]);
                continue;
            }
        };
        let closing = match parse_closing_time(&caps[3], now) {
            Some(t) => t,
            None => {
                debug!("{asset}: unparseable closing time {:?}, treating as closed", &caps[3]);
                now - Duration::seconds(1)
            }
        };
        markets.push(Market::pending(asset, target, closing, probability));
    }
    debug!("Extracted {} markets", markets.len());
    markets
}

/// Parse `"Jan 5, 14:00 UTC"` into an instant in the current UTC year.
///
/// If that instant has already passed it is moved to the next year (listings
/// around New Year show January dates in December).
pub fn parse_closing_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let cleaned = text.replace(',', "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let stamp = cleaned.strip_suffix(" UTC")?;
    let this_year = at_year(stamp, now.year())?;
    if this_year < now {
        at_year(stamp, now.year() + 1)
    } else {
        Some(this_year)
    }
}

fn at_year(stamp: &str, year: i32) -> Option<DateTime<Utc>> {
    let with_year = format!("{year} {stamp}");
    let naive = NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M").ok()?;
    Utc.from_local_datetime(&naive).single()
}
