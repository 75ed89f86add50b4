use anyhow::{Context, Result};
use notification_service::{SmsConfig, TwilioSmsNotifier};
use polygon_client::PolygonClient;

mod config;
mod monitor;
mod scheduler;

use config::AppConfig;
use monitor::PriceMonitor;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Panic hook: log panic info before crashing
    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    // 2. Configuration
    let config = AppConfig::load()?;
    let sms = SmsConfig::from_env();

    let missing = sms.missing_fields();
    if !missing.is_empty() {
        tracing::warn!(
            "SMS settings not set: {} (alerts will fail to send)",
            missing.join(", ")
        );
    }

    let transport = TwilioSmsNotifier::new(&sms);

    if config.test_sms {
        let sid = monitor::send_test_message(&transport, &sms).await?;
        tracing::info!("Test SMS sent to {} ({})", sms.to_number, sid);
        return Ok(());
    }

    // 3. Market data
    let api_key = config
        .polygon_api_key
        .clone()
        .context("POLYGON_API_KEY not set")?;
    let market_data = PolygonClient::new(api_key);

    tracing::info!("Starting price alert monitor");
    tracing::info!("  Symbols: {}", config.symbols.join(", "));
    tracing::info!("  Threshold: {}%", config.threshold_pct);
    tracing::info!("  Check interval: {} seconds", config.interval_secs);

    let monitor = PriceMonitor::new(
        market_data,
        transport,
        &sms,
        config.symbols.clone(),
        config.threshold_pct,
    );

    // 4. Runs until killed; a failed SMS send ends the process with an error.
    scheduler::run(monitor, config.interval()).await?;

    Ok(())
}
