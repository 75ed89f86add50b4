use async_trait::async_trait;

use crate::{DailyClose, Result};

/// Source of daily history and live prices for a ticker.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent daily closes in chronological order, at most two sessions.
    /// An empty vector means the provider has no history for the symbol.
    async fn recent_closes(&self, symbol: &str) -> Result<Vec<DailyClose>>;

    /// Latest traded price. `MonitorError::PriceUnavailable` when there is none.
    async fn current_price(&self, symbol: &str) -> Result<f64>;

    /// Baseline close for a symbol: the earlier of the last two sessions,
    /// or the only session if just one exists.
    async fn previous_close(&self, symbol: &str) -> Result<Option<f64>> {
        let closes = self.recent_closes(symbol).await?;
        Ok(select_previous_close(&closes))
    }

    fn provider_name(&self) -> &str;
}

/// Outbound text-message delivery.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver `body` from `from` to `to`, returning the provider's message id.
    async fn send_message(&self, body: &str, from: &str, to: &str) -> Result<String>;

    fn name(&self) -> &str;
}

pub fn select_previous_close(closes: &[DailyClose]) -> Option<f64> {
    match closes {
        [] => None,
        [only] => Some(only.close),
        [earlier, ..] => Some(earlier.close),
    }
}
