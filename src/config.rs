use crate::error::{AppError, Result};

/// Hourly re-run cadence for every saved scanner.
pub const SCANNER_INTERVAL_SECS: u64 = 3_600;

/// Alert evaluation cadence (seconds).
pub const ALERT_INTERVAL_SECS: u64 = 300;

/// Ticker metrics recompute cadence (seconds). Also runs once at startup so
/// the canned scanners have aggregates before the first daily tick.
pub const METRICS_INTERVAL_SECS: u64 = 86_400;

/// Tickers processed per batch by the metrics aggregator.
pub const METRICS_BATCH_SIZE: i64 = 100;

/// Trailing window for the stored avg_dividend_yield aggregate (months).
pub const DIVIDEND_WINDOW_MONTHS: u32 = 12;

/// Trailing window for the stored insider_buys_90d aggregate (days).
pub const INSIDER_WINDOW_DAYS: i64 = 90;

/// Canned "high dividend" scanner: minimum stored avg_dividend_yield.
pub const HIGH_DIVIDEND_MIN_YIELD: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub api_port: u16,
    pub log_level: String,
    /// Optional webhook URL for alert notifications (ALERT_WEBHOOK_URL).
    /// When unset, notifications are logged instead of dispatched.
    pub alert_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "dividash.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            alert_webhook_url: std::env::var("ALERT_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
        })
    }
}
