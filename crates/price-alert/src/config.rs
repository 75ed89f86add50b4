use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

/// Watch a list of tickers and text an alert when one moves past the
/// threshold from its previous close.
#[derive(Debug, Clone, Parser)]
#[command(name = "price-alert", version)]
pub struct AppConfig {
    /// Ticker symbols to monitor, in order
    #[arg(
        env = "WATCHLIST",
        value_delimiter = ',',
        default_values = ["SPY", "IWM", "QQQ"]
    )]
    pub symbols: Vec<String>,

    /// Percent move from previous close that triggers an alert
    #[arg(long, env = "ALERT_THRESHOLD_PCT", default_value_t = 1.0)]
    pub threshold_pct: f64,

    /// Seconds between price checks
    #[arg(long, env = "CHECK_INTERVAL_SECONDS", default_value_t = 60)]
    pub interval_secs: u64,

    /// Polygon.io API key
    #[arg(long, env = "POLYGON_API_KEY", hide_env_values = true)]
    pub polygon_api_key: Option<String>,

    /// Send one test SMS and exit
    #[arg(long)]
    pub test_sms: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_parsed(Self::parse())
    }

    fn from_parsed(mut config: Self) -> Result<Self> {
        config.symbols = normalize_symbols(&config.symbols);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("No ticker symbols to monitor");
        }
        if !self.threshold_pct.is_finite() || self.threshold_pct <= 0.0 {
            bail!(
                "ALERT_THRESHOLD_PCT must be a positive number, got {}",
                self.threshold_pct
            );
        }
        if self.interval_secs == 0 {
            bail!("CHECK_INTERVAL_SECONDS must be at least 1");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Trim, upper-case and de-duplicate symbols, keeping first occurrence order.
fn normalize_symbols(raw: &[String]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::with_capacity(raw.len());
    for symbol in raw {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}
