pub mod api;
pub mod config;
pub mod engine;
pub mod notifier;
pub mod parser;
pub mod reporter;
pub mod state;
pub mod types;

/// Daily crypto markets listing on Limitless.
pub const LISTING_URL: &str = "https://limitless.exchange/pro/cat/daily";

/// Link appended to every alert.
pub const LIMITLESS_URL: &str = "https://limitless.exchange";

/// Binance REST API base URL (public, no auth required)
pub const PRICE_API_BASE: &str = "https://api.binance.com";

/// Telegram Bot API base URL
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
