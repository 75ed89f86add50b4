use std::time::Duration;

use monitor_core::{MarketDataProvider, NotificationTransport, Result};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::monitor::PriceMonitor;

/// Load baselines once, then check prices every `period` until the process is
/// killed. Only a notification failure ends the loop.
pub async fn run<M, N>(mut monitor: PriceMonitor<M, N>, period: Duration) -> Result<()>
where
    M: MarketDataProvider,
    N: NotificationTransport,
{
    let loaded = monitor.load_baselines().await;
    if loaded == 0 {
        tracing::warn!("No symbol has a baseline; price checks will have nothing to compare");
    } else {
        tracing::info!("Loaded {} baselines", loaded);
    }

    // First check fires one full period after startup.
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks: u64 = 0;
    loop {
        interval.tick().await;
        ticks += 1;

        let started = Instant::now();
        let summary = monitor.check_prices().await?;
        tracing::debug!(
            "Tick #{}: {} evaluated, {} skipped, {} alerts in {:.1}s",
            ticks,
            summary.evaluated,
            summary.skipped,
            summary.alerts.len(),
            started.elapsed().as_secs_f64()
        );
    }
}
