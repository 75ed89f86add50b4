use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use monitor_core::{DailyClose, MarketDataProvider, MonitorError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.polygon.io";

/// Calendar days of daily bars requested for the baseline; spans weekends and holidays.
const HISTORY_LOOKBACK_DAYS: i64 = 7;

/// Sessions kept from the lookback window.
const HISTORY_SESSIONS: usize = 2;

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| MonitorError::MarketData(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MonitorError::MarketData(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        Ok(response)
    }

    /// Get daily bars for a symbol between two dates (inclusive), oldest first
    pub async fn get_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyClose>> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .get(&url, &[("adjusted", "true"), ("sort", "asc")])
            .await?;

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::MarketData(e.to_string()))?;

        Ok(agg_response.into_closes())
    }

    /// Get snapshot for a ticker (near-real-time last trade, today's OHLCV, prev day)
    pub async fn get_snapshot(&self, symbol: &str) -> Result<SnapshotTicker> {
        let url = format!(
            "{}/v2/snapshot/locale/us/markets/stocks/tickers/{}",
            self.base_url, symbol
        );

        let response = self.get(&url, &[]).await?;

        let snap_response: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::MarketData(e.to_string()))?;

        Ok(snap_response.ticker)
    }
}

#[async_trait]
impl MarketDataProvider for PolygonClient {
    /// Before the open or on a non-trading day the two sessions are D-1 and D-2,
    /// so the baseline derived from them is the D-2 close.
    async fn recent_closes(&self, symbol: &str) -> Result<Vec<DailyClose>> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(HISTORY_LOOKBACK_DAYS);

        let bars = self.get_daily_bars(symbol, from, today).await?;
        tracing::debug!("{}: {} daily bars in lookback window", symbol, bars.len());

        Ok(last_sessions(bars, HISTORY_SESSIONS))
    }

    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let snapshot = self.get_snapshot(symbol).await?;
        snapshot
            .last_price()
            .ok_or_else(|| MonitorError::PriceUnavailable(symbol.to_string()))
    }

    fn provider_name(&self) -> &str {
        "polygon"
    }
}

/// Keep the trailing `n` bars, preserving chronological order.
fn last_sessions(mut bars: Vec<DailyClose>, n: usize) -> Vec<DailyClose> {
    if bars.len() > n {
        bars.drain(..bars.len() - n);
    }
    bars
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp (ms, session start)
    c: f64, // close
}

impl AggregateResponse {
    fn into_closes(self) -> Vec<DailyClose> {
        let mut closes: Vec<DailyClose> = self
            .results
            .into_iter()
            .filter_map(|r| {
                DateTime::from_timestamp_millis(r.t).map(|ts| DailyClose {
                    date: ts.date_naive(),
                    close: r.c,
                })
            })
            .collect();
        closes.sort_by_key(|c| c.date);
        closes
    }
}

// Snapshot types
#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    ticker: SnapshotTicker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTicker {
    pub ticker: Option<String>,
    pub day: Option<SnapshotDay>,
    #[serde(rename = "lastTrade")]
    pub last_trade: Option<SnapshotLastTrade>,
    #[serde(rename = "prevDay")]
    pub prev_day: Option<SnapshotDay>,
    #[serde(rename = "todaysChangePerc")]
    pub todays_change_perc: Option<f64>,
}

impl SnapshotTicker {
    /// Last traded price, if the snapshot carries a usable one.
    pub fn last_price(&self) -> Option<f64> {
        self.last_trade
            .as_ref()
            .and_then(|t| t.p)
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDay {
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
    pub v: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLastTrade {
    pub p: Option<f64>,
    pub s: Option<i64>,
    pub t: Option<i64>,
}
