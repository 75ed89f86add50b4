use monitor_core::{
    percent_change, Direction, MarketDataProvider, NotificationTransport, PriceMove, Result,
};
use notification_service::{AlertTemplate, SmsConfig};

const TEST_MESSAGE: &str = "Hello there!";

/// Outcome of one tick, for logging.
#[derive(Debug, Default)]
pub struct TickSummary {
    pub evaluated: usize,
    pub skipped: usize,
    pub alerts: Vec<PriceMove>,
}

/// Compares live prices against previous-close baselines and texts an alert
/// for every symbol past the threshold.
pub struct PriceMonitor<M, N> {
    market_data: M,
    transport: N,
    from_number: String,
    to_number: String,
    symbols: Vec<String>,
    /// Written once by `load_baselines`, in tracked-symbol order.
    baselines: Vec<(String, f64)>,
    threshold_pct: f64,
}

impl<M, N> PriceMonitor<M, N>
where
    M: MarketDataProvider,
    N: NotificationTransport,
{
    pub fn new(
        market_data: M,
        transport: N,
        sms: &SmsConfig,
        symbols: Vec<String>,
        threshold_pct: f64,
    ) -> Self {
        Self {
            market_data,
            transport,
            from_number: sms.from_number.clone(),
            to_number: sms.to_number.clone(),
            symbols,
            baselines: Vec::new(),
            threshold_pct,
        }
    }

    #[cfg(test)]
    pub fn baselines(&self) -> &[(String, f64)] {
        &self.baselines
    }

    /// Fetch the previous close of every tracked symbol. Symbols without
    /// history are left out and never alert for the rest of the run.
    pub async fn load_baselines(&mut self) -> usize {
        let mut baselines = Vec::with_capacity(self.symbols.len());

        for symbol in &self.symbols {
            match self.market_data.previous_close(symbol).await {
                Ok(Some(close)) if close.is_finite() && close > 0.0 => {
                    tracing::info!("{} baseline (previous close): ${:.2}", symbol, close);
                    baselines.push((symbol.clone(), close));
                }
                Ok(Some(close)) => {
                    tracing::warn!("Invalid previous close {} for {}. Skipping...", close, symbol);
                }
                Ok(None) => {
                    tracing::info!("No historical data available for {}. Skipping...", symbol);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load history for {} from {}: {}. Skipping...",
                        symbol,
                        self.market_data.provider_name(),
                        e
                    );
                }
            }
        }

        self.baselines = baselines;
        self.baselines.len()
    }

    /// One tick. Price lookups that fail are skipped for this tick only;
    /// a failed SMS send is returned to the caller.
    pub async fn check_prices(&self) -> Result<TickSummary> {
        let mut summary = TickSummary::default();

        for (symbol, baseline) in &self.baselines {
            let current = match self.market_data.current_price(symbol).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!("Unable to fetch the current price for {}: {}", symbol, e);
                    summary.skipped += 1;
                    continue;
                }
            };
            summary.evaluated += 1;

            let Some(price_move) = evaluate(symbol, *baseline, current, self.threshold_pct) else {
                tracing::debug!(
                    "{}: ${:.2} vs ${:.2} ({:+.2}%)",
                    symbol,
                    current,
                    baseline,
                    percent_change(*baseline, current)
                );
                continue;
            };

            let body = AlertTemplate::render(&price_move, self.threshold_pct, &chrono::Local::now());
            let sid = self
                .transport
                .send_message(&body, &self.from_number, &self.to_number)
                .await?;

            tracing::info!(
                "Alert sent via {} ({}): {} {} {:+.2}% (${:.2} -> ${:.2})",
                self.transport.name(),
                sid,
                price_move.symbol,
                price_move.direction,
                price_move.pct_change,
                price_move.baseline,
                price_move.current
            );
            summary.alerts.push(price_move);
        }

        Ok(summary)
    }
}

/// Send a fixed message to confirm SMS credentials work.
pub async fn send_test_message<N: NotificationTransport>(
    transport: &N,
    sms: &SmsConfig,
) -> Result<String> {
    transport
        .send_message(TEST_MESSAGE, &sms.from_number, &sms.to_number)
        .await
}

/// A move qualifies when its absolute percent change reaches the threshold.
pub fn evaluate(symbol: &str, baseline: f64, current: f64, threshold_pct: f64) -> Option<PriceMove> {
    let pct_change = percent_change(baseline, current);
    if pct_change.abs() < threshold_pct {
        return None;
    }

    Some(PriceMove {
        symbol: symbol.to_string(),
        baseline,
        current,
        pct_change,
        direction: Direction::from_change(pct_change),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use monitor_core::{DailyClose, MonitorError};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Scripted market data: fixed history per symbol and a queue of live
    /// prices per symbol (`None` entries mean "unavailable").
    #[derive(Clone, Default)]
    pub(crate) struct MockMarket {
        history: HashMap<String, Vec<f64>>,
        failing_history: Vec<String>,
        prices: Arc<Mutex<HashMap<String, Vec<Option<f64>>>>>,
        pub(crate) history_calls: Arc<Mutex<usize>>,
        pub(crate) price_calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockMarket {
        pub(crate) fn with_history(mut self, symbol: &str, closes: &[f64]) -> Self {
            self.history.insert(symbol.to_string(), closes.to_vec());
            self
        }

        pub(crate) fn with_failing_history(mut self, symbol: &str) -> Self {
            self.failing_history.push(symbol.to_string());
            self
        }

        /// Prices returned on successive ticks; the last one repeats.
        pub(crate) fn with_prices(self, symbol: &str, prices: &[Option<f64>]) -> Self {
            self.prices
                .lock()
                .unwrap()
                .insert(symbol.to_string(), prices.to_vec());
            self
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockMarket {
        async fn recent_closes(&self, symbol: &str) -> Result<Vec<DailyClose>> {
            *self.history_calls.lock().unwrap() += 1;
            if self.failing_history.iter().any(|s| s == symbol) {
                return Err(MonitorError::MarketData("HTTP 500: boom".into()));
            }
            let closes = self.history.get(symbol).cloned().unwrap_or_default();
            Ok(closes
                .into_iter()
                .enumerate()
                .map(|(i, close)| DailyClose {
                    date: NaiveDate::from_ymd_opt(2024, 3, 4 + i as u32).unwrap(),
                    close,
                })
                .collect())
        }

        async fn current_price(&self, symbol: &str) -> Result<f64> {
            self.price_calls.lock().unwrap().push(symbol.to_string());
            let mut prices = self.prices.lock().unwrap();
            let queue = prices.entry(symbol.to_string()).or_default();
            let next = if queue.len() > 1 {
                queue.remove(0)
            } else {
                queue.first().copied().flatten()
            };
            next.ok_or_else(|| MonitorError::PriceUnavailable(symbol.to_string()))
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    /// Records every message; fails once `fail_after` sends have succeeded.
    #[derive(Clone, Default)]
    pub(crate) struct MockTransport {
        pub(crate) sent: Arc<Mutex<Vec<(String, String, String)>>>,
        fail_after: Option<usize>,
    }

    impl MockTransport {
        pub(crate) fn failing_after(sends: usize) -> Self {
            Self {
                fail_after: Some(sends),
                ..Default::default()
            }
        }

        pub(crate) fn bodies(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(b, _, _)| b.clone()).collect()
        }
    }

    #[async_trait]
    impl NotificationTransport for MockTransport {
        async fn send_message(&self, body: &str, from: &str, to: &str) -> Result<String> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
                return Err(MonitorError::Notification("HTTP 401: Authenticate".into()));
            }
            sent.push((body.to_string(), from.to_string(), to.to_string()));
            Ok(format!("SM{:032}", sent.len()))
        }

        fn name(&self) -> &str {
            "mock-sms"
        }
    }

    pub(crate) fn sms() -> SmsConfig {
        SmsConfig {
            account_sid: "AC00000000000000000000000000000000".into(),
            auth_token: "token".into(),
            from_number: "+15005550006".into(),
            to_number: "+15551234567".into(),
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_evaluate_scenarios() {
        let rise = evaluate("SPY", 100.0, 101.5, 1.0).unwrap();
        assert_eq!(rise.direction, Direction::Rise);
        assert!((rise.pct_change - 1.5).abs() < 1e-9);

        assert!(evaluate("SPY", 100.0, 99.2, 1.0).is_none());

        let drop = evaluate("SPY", 100.0, 98.9, 1.0).unwrap();
        assert_eq!(drop.direction, Direction::Drop);
        assert!((drop.pct_change + 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_threshold_is_inclusive() {
        let exact = evaluate("IWM", 200.0, 202.0, 1.0).unwrap();
        assert_eq!(exact.direction, Direction::Rise);
        assert!(evaluate("IWM", 200.0, 201.9, 1.0).is_none());
        assert!(evaluate("IWM", 200.0, 200.0, 1.0).is_none());
    }

    #[tokio::test]
    async fn test_load_baselines_selection_rules() {
        let market = MockMarket::default()
            .with_history("SPY", &[500.0, 505.0])
            .with_history("IWM", &[201.25])
            .with_history("QQQ", &[]);
        let mut monitor = PriceMonitor::new(
            market,
            MockTransport::default(),
            &sms(),
            symbols(&["SPY", "IWM", "QQQ"]),
            1.0,
        );

        assert_eq!(monitor.load_baselines().await, 2);
        assert_eq!(
            monitor.baselines(),
            &[("SPY".to_string(), 500.0), ("IWM".to_string(), 201.25)]
        );
    }

    #[tokio::test]
    async fn test_unusable_previous_close_excludes_symbol() {
        let market = MockMarket::default()
            .with_history("SPY", &[0.0])
            .with_history("QQQ", &[f64::NAN])
            .with_history("IWM", &[100.0])
            .with_prices("SPY", &[Some(50.0)])
            .with_prices("QQQ", &[Some(50.0)])
            .with_prices("IWM", &[Some(100.2)]);
        let price_calls = market.price_calls.clone();
        let transport = MockTransport::default();
        let mut monitor = PriceMonitor::new(
            market,
            transport.clone(),
            &sms(),
            symbols(&["SPY", "QQQ", "IWM"]),
            1.0,
        );

        assert_eq!(monitor.load_baselines().await, 1);
        assert_eq!(monitor.baselines(), &[("IWM".to_string(), 100.0)]);

        let summary = tokio_test::assert_ok!(monitor.check_prices().await);
        assert_eq!(summary.evaluated, 1);
        assert!(summary.alerts.is_empty());
        assert!(transport.bodies().is_empty());
        assert_eq!(*price_calls.lock().unwrap(), vec!["IWM"]);
    }

    #[tokio::test]
    async fn test_history_error_excludes_symbol() {
        let market = MockMarket::default()
            .with_history("SPY", &[100.0])
            .with_failing_history("QQQ");
        let mut monitor = PriceMonitor::new(
            market,
            MockTransport::default(),
            &sms(),
            symbols(&["QQQ", "SPY"]),
            1.0,
        );

        assert_eq!(monitor.load_baselines().await, 1);
        assert_eq!(monitor.baselines()[0].0, "SPY");
    }

    #[tokio::test]
    async fn test_check_prices_alerts_and_addresses() {
        let market = MockMarket::default()
            .with_history("SPY", &[100.0, 100.7])
            .with_history("IWM", &[100.0])
            .with_history("QQQ", &[100.0])
            .with_prices("SPY", &[Some(101.5)])
            .with_prices("IWM", &[Some(99.2)])
            .with_prices("QQQ", &[Some(98.9)]);
        let transport = MockTransport::default();
        let mut monitor = PriceMonitor::new(
            market,
            transport.clone(),
            &sms(),
            symbols(&["SPY", "IWM", "QQQ"]),
            1.0,
        );
        monitor.load_baselines().await;

        let summary = monitor.check_prices().await.unwrap();
        assert_eq!(summary.evaluated, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.alerts.len(), 2);

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].0.starts_with("SPY: rise >= 1%, Timestamp: "));
        assert!(sent[1].0.starts_with("QQQ: drop >= 1%, Timestamp: "));
        assert_eq!(sent[0].1, "+15005550006");
        assert_eq!(sent[0].2, "+15551234567");
    }

    #[tokio::test]
    async fn test_repeated_ticks_are_not_deduplicated() {
        let market = MockMarket::default()
            .with_history("SPY", &[100.0])
            .with_prices("SPY", &[Some(102.0)]);
        let transport = MockTransport::default();
        let mut monitor =
            PriceMonitor::new(market, transport.clone(), &sms(), symbols(&["SPY"]), 1.0);
        monitor.load_baselines().await;

        monitor.check_prices().await.unwrap();
        monitor.check_prices().await.unwrap();

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 2);
        assert!(bodies.iter().all(|b| b.starts_with("SPY: rise")));
    }

    #[tokio::test]
    async fn test_unavailable_price_skips_only_that_symbol_for_one_tick() {
        let market = MockMarket::default()
            .with_history("SPY", &[100.0])
            .with_history("QQQ", &[100.0])
            .with_prices("SPY", &[None, Some(103.0)])
            .with_prices("QQQ", &[Some(97.0)]);
        let transport = MockTransport::default();
        let mut monitor = PriceMonitor::new(
            market,
            transport.clone(),
            &sms(),
            symbols(&["SPY", "QQQ"]),
            1.0,
        );
        monitor.load_baselines().await;

        let first = monitor.check_prices().await.unwrap();
        assert_eq!(first.skipped, 1);
        assert_eq!(first.evaluated, 1);
        assert_eq!(first.alerts[0].symbol, "QQQ");

        let second = monitor.check_prices().await.unwrap();
        assert_eq!(second.skipped, 0);
        assert_eq!(second.alerts.len(), 2);
        assert_eq!(second.alerts[0].symbol, "SPY");
    }

    #[tokio::test]
    async fn test_symbol_without_history_is_never_evaluated() {
        let market = MockMarket::default()
            .with_history("SPY", &[100.0])
            .with_prices("SPY", &[Some(100.1)])
            .with_prices("NEWCO", &[Some(50.0)]);
        let price_calls = market.price_calls.clone();
        let mut monitor = PriceMonitor::new(
            market,
            MockTransport::default(),
            &sms(),
            symbols(&["NEWCO", "SPY"]),
            1.0,
        );
        monitor.load_baselines().await;

        for _ in 0..3 {
            monitor.check_prices().await.unwrap();
        }
        let calls = price_calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["SPY", "SPY", "SPY"]);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let market = MockMarket::default()
            .with_history("SPY", &[100.0])
            .with_history("QQQ", &[100.0])
            .with_prices("SPY", &[Some(95.0)])
            .with_prices("QQQ", &[Some(95.0)]);
        let transport = MockTransport::failing_after(1);
        let mut monitor = PriceMonitor::new(
            market,
            transport.clone(),
            &sms(),
            symbols(&["SPY", "QQQ"]),
            1.0,
        );
        monitor.load_baselines().await;

        let result = monitor.check_prices().await;
        assert!(matches!(result, Err(MonitorError::Notification(_))));
        assert_eq!(transport.bodies().len(), 1);
    }

    #[tokio::test]
    async fn test_send_test_message() {
        let transport = MockTransport::default();
        let sid = tokio_test::assert_ok!(send_test_message(&transport, &sms()).await);
        assert!(sid.starts_with("SM"));
        assert_eq!(transport.bodies(), vec!["Hello there!"]);
    }
}
