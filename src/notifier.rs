use anyhow::{Result, bail};
use serde::Serialize;
use tracing::debug;

use crate::LIMITLESS_URL;
use crate::config::TelegramConfig;
use crate::types::Market;

/// Telegram Bot API `sendMessage` client.
pub struct Notifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl Notifier {
    pub fn from_config(client: reqwest::Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.trim().to_string(),
            chat_id: config.chat_id.trim().to_string(),
        }
    }

    /// Both a bot token and a chat id are set.
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    /// Where alerts go, for startup logs.
    pub fn destination(&self) -> String {
        if self.is_configured() {
            format!("Telegram chat {}", self.chat_id)
        } else {
            "nowhere (set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID)".to_string()
        }
    }

    /// Send an alert for `market`. Returns `Ok(false)` when Telegram isn't
    /// configured.
    pub async fn send_alert(&self, market: &Market, minutes_left: i64) -> Result<bool> {
        if !self.is_configured() {
            return Ok(false);
        }
        let text = format_alert(market, minutes_left);
        self.send_text(&text).await?;
        Ok(true)
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };
        // The URL embeds the bot token; keep it out of error messages.
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Telegram request failed: {}", e.without_url()))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            bail!("Telegram returned {status}: {detail}");
        }
        debug!("Telegram message delivered ({} chars)", text.len());
        Ok(())
    }
}

/// Render the alert message (Telegram legacy Markdown).
pub fn format_alert(market: &Market, minutes_left: i64) -> String {
    let bet_type = market
        .bet_type
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_string());
    let current = market
        .current_price
        .map(|p| format!("${p:.4}"))
        .unwrap_or_else(|| "n/a".to_string());
    let diff = market
        .price_diff_percent
        .map(|d| format!("{d:+.2}%"))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "🚨 *LIMITLESS BOT ALERT*\n\n\
         🏷️ Asset: {asset}\n\
         ⏰ Time Left: {minutes_left} minutes\n\
         🎯 Signal: {signal}\n\
         📊 Bet Type: {bet_type}\n\
         💰 Target: ${target:.4}\n\
         📈 Current: {current}\n\
         📉 Difference: {diff}\n\
         ⭐ Score: {score}/100\n\n\
         ⏳ Closes: {closes}\n\
         🔗 {LIMITLESS_URL}",
        asset = market.asset,
        signal = market.signal,
        target = market.target_price,
        score = market.edge_score,
        closes = market.closing_time_utc.format("%H:%M UTC"),
    )
}
